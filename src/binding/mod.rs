//! Object ↔ graph binding
//!
//! Converts typed objects (possibly cyclic) into RDF statements and back.
//!
//! - [`GraphWriter`] marshals an object graph into statements
//! - [`GraphReader`] rebuilds objects from statements
//! - [`LiveProxy`] reads and writes single properties directly against the store
//! - [`BindingRegistry`] is the facade tying these together with
//!   transactions, per-node locking and binding-class metadata
//!
//! Type information comes from [`TypeDescriptor`]s registered in a
//! [`DescriptorRegistry`]; the type of a stored node is recovered from the
//! `bindingClass` statement recorded for its `rdf:type`.

mod codec;
mod container;
mod descriptor;
mod engine;
mod error;
mod identity;
mod lock;
mod proxy;
mod reader;
mod registry;
mod value;
mod writer;

pub use codec::{LiteralCodec, XsdLiteralCodec};
pub use descriptor::{
    Cardinality, ContainerKind, DescriptorRegistry, PropertyDescriptor, PropertySpec,
    TypeDescriptor, TypeDescriptorBuilder, ValueKind,
};
pub use engine::CreatedListener;
pub use error::{BindingError, BindingResult};
pub use identity::{MarshalCache, UnmarshalCache};
pub use lock::{LockRegistry, NodeLock, ReadGuard, WriteGuard, WriteLocks};
pub use proxy::{LiveProxy, ProxyNodeCache};
pub use reader::GraphReader;
pub use registry::{BindingRegistry, Objects, Proxies, RegistryBuilder};
pub use value::{Bound, Instance, Value};
pub use writer::GraphWriter;
