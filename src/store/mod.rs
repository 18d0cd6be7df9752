//! Triple-store boundary
//!
//! The binding engine talks to a repository through the narrow capability set
//! defined here: statement existence checks, pattern lookups, statement
//! add/remove, per-connection transactions and CONSTRUCT evaluation for the
//! legacy inverse lookup. Each worker thread owns exactly one connection,
//! handed out by [`ConnectionPool`].
//!
//! [`MemoryRepository`] is the in-process reference implementation.

mod memory;
mod pool;

pub use memory::{MemoryConnection, MemoryRepository, MemoryStore};
pub use pool::ConnectionPool;

use crate::rdf::{
    GraphName, NamedNode, ParseError, RdfObject, RdfSubject, Statement, StatementPattern,
};
use crate::sparql::QueryError;
use std::sync::Arc;
use thiserror::Error;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// begin() while a transaction is already active
    #[error("Transaction already active")]
    TransactionActive,

    /// commit()/rollback() without an active transaction
    #[error("No active transaction")]
    NoActiveTransaction,

    /// Repository rejects writes
    #[error("Repository is read-only")]
    ReadOnly,

    /// Graph query failed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Fixture data could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Backend I/O failure
    #[error("Store I/O error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Closeable sequence of statements returned by a lookup
///
/// Once closed the sequence yields nothing further.
pub struct Statements {
    inner: std::vec::IntoIter<Statement>,
    closed: bool,
}

impl Statements {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            inner: statements.into_iter(),
            closed: false,
        }
    }

    /// Release the sequence
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Iterator for Statements {
    type Item = Statement;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next()
    }
}

/// One connection to a repository, owned by a single thread
///
/// For writes, an empty `graphs` slice means the default graph; for reads and
/// removals it means every graph.
pub trait Connection: Send + Sync {
    /// Whether the connection can still be used
    fn is_open(&self) -> bool;

    /// Close the connection, rolling back any active transaction
    fn close(&self);

    fn has_statement(&self, pattern: &StatementPattern, graphs: &[GraphName]) -> StoreResult<bool>;

    fn get_statements(
        &self,
        pattern: &StatementPattern,
        graphs: &[GraphName],
    ) -> StoreResult<Statements>;

    /// Add `(subject, predicate, object)` to every graph in `graphs`
    fn add_statement(
        &self,
        subject: &RdfSubject,
        predicate: &NamedNode,
        object: &RdfObject,
        graphs: &[GraphName],
    ) -> StoreResult<()>;

    /// Remove every statement matching `pattern`; returns how many were removed
    fn remove_statements(
        &self,
        pattern: &StatementPattern,
        graphs: &[GraphName],
    ) -> StoreResult<usize>;

    fn begin(&self) -> StoreResult<()>;

    fn commit(&self) -> StoreResult<()>;

    fn rollback(&self) -> StoreResult<()>;

    /// Whether a transaction is active on this connection
    fn is_active(&self) -> bool;

    /// Evaluate a SPARQL CONSTRUCT query and return the constructed statements
    fn evaluate_graph_query(&self, query: &str) -> StoreResult<Vec<Statement>>;
}

/// A repository hands out connections
pub trait Repository: Send + Sync {
    fn connect(&self) -> StoreResult<Arc<dyn Connection>>;
}
