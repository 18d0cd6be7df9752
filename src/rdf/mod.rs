//! RDF (Resource Description Framework) term model
//!
//! This module provides the RDF primitives the binding engine speaks:
//! - Named nodes, blank nodes and literals (wrapping oxrdf)
//! - Statements with an optional named graph (the store partition)
//! - Statement patterns for store lookups
//! - Namespace prefixes and the vocabulary written by the engine
//! - Turtle parsing/serialization for fixtures
//!
//! # Example
//!
//! ```rust
//! use samyama_bind::rdf::{Literal, NamedNode, Statement, StatementPattern};
//!
//! let alice = NamedNode::new("http://example.org/alice").unwrap();
//! let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let statement = Statement::new(
//!     alice.clone().into(),
//!     name.clone(),
//!     Literal::new_simple_literal("Alice").into(),
//! );
//!
//! let pattern = StatementPattern::forward(&alice.into(), &name);
//! assert!(pattern.matches(&statement, &[]));
//! ```

mod namespace;
mod types;
pub mod serialization;

pub use types::{
    BlankNode, GraphName, Literal, NamedNode, RdfError, RdfObject, RdfResult, RdfSubject,
    Statement, StatementPattern,
};

pub use namespace::{vocab, NamespaceManager, PrefixError, PrefixResult};

pub use serialization::{ParseError, ParseResult, SerializeError, SerializeResult};
