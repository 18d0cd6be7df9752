//! SPARQL CONSTRUCT support
//!
//! The binding engine only needs one query form: the CONSTRUCT used by the
//! inverse-property fallback to reach relationships stored through legacy
//! container nodes. Queries are parsed with spargebra and evaluated directly
//! against the in-memory store.
//!
//! # Example
//!
//! ```rust
//! use samyama_bind::sparql;
//! use samyama_bind::store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let statements = sparql::construct(
//!     &store,
//!     "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }",
//! ).unwrap();
//! assert!(statements.is_empty());
//! ```

mod executor;
mod parser;

pub use executor::evaluate;
pub use parser::{parse_construct, ConstructQuery};

use crate::rdf::Statement;
use crate::store::MemoryStore;
use thiserror::Error;

/// Query errors
#[derive(Error, Debug)]
pub enum QueryError {
    /// Syntax error
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Unsupported query form or pattern
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Parse and evaluate a CONSTRUCT query in one step
pub fn construct(store: &MemoryStore, query: &str) -> QueryResult<Vec<Statement>> {
    let parsed = parse_construct(query)?;
    evaluate(store, &parsed)
}
