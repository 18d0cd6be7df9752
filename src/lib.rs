//! Samyama Bind
//!
//! Binds typed application objects to nodes in an RDF graph. Objects are
//! persisted as subject-predicate-object statements in a triple-store
//! repository and reconstructed from them, under concurrent multi-threaded
//! access.
//!
//! # Modules
//!
//! - [`rdf`]: RDF terms, vocabulary, namespaces and Turtle I/O
//! - [`store`]: the repository/connection boundary, per-thread connection
//!   pool and an in-memory repository
//! - [`sparql`]: CONSTRUCT query parsing and evaluation
//! - [`binding`]: the mapping engine, live proxies and the registry facade
//! - [`config`]: engine configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_bind::binding::{
//!     BindingRegistry, ContainerKind, DescriptorRegistry, Instance, PropertySpec, TypeDescriptor,
//!     Value, ValueKind,
//! };
//! use samyama_bind::store::MemoryRepository;
//! use std::sync::Arc;
//!
//! let descriptors = Arc::new(DescriptorRegistry::new());
//! let person = descriptors
//!     .register(
//!         TypeDescriptor::builder("Person", "foaf:Person")
//!             .subject("id")
//!             .namespace("http://example.org/people/")
//!             .property(PropertySpec::scalar("name", "foaf:name", ValueKind::String))
//!             .property(
//!                 PropertySpec::collection("nick", "foaf:nick", ValueKind::String)
//!                     .container(ContainerKind::Seq),
//!             )
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let registry = BindingRegistry::new(Arc::new(MemoryRepository::new()), descriptors).unwrap();
//!
//! let john = Instance::with_id(person, "john").unwrap();
//! john.set("name", "John").unwrap();
//! john.set("nick", vec!["jj", "johnny"]).unwrap();
//! let node = registry.add(&john).unwrap();
//!
//! let copy = registry.get(&node).unwrap().unwrap();
//! assert_eq!(copy.get("name").unwrap(), Value::from("John"));
//! assert_eq!(copy.get("nick").unwrap(), Value::from(vec!["jj", "johnny"]));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod config;
pub mod rdf;
pub mod sparql;
pub mod store;

// Re-export main types for convenience
pub use binding::{
    BindingError, BindingRegistry, BindingResult, Bound, DescriptorRegistry, Instance, LiveProxy,
    TypeDescriptor, Value,
};

pub use config::{BindingConfig, ConfigError};

pub use rdf::{
    BlankNode, GraphName, Literal, NamedNode, RdfObject, RdfSubject, Statement, StatementPattern,
};

pub use store::{Connection, MemoryRepository, Repository, StoreError, StoreResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
