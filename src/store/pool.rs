//! Per-thread connection pool
//!
//! Every worker thread gets exactly one connection, opened lazily on first use
//! and replaced transparently if it is found closed. A connection is never
//! handed to a second thread, so nothing guards its use.

use super::{Connection, Repository, StoreResult};
use dashmap::DashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

pub struct ConnectionPool {
    repository: Arc<dyn Repository>,
    connections: DashMap<ThreadId, Arc<dyn Connection>>,
}

impl ConnectionPool {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            connections: DashMap::new(),
        }
    }

    /// The calling thread's connection
    pub fn current(&self) -> StoreResult<Arc<dyn Connection>> {
        let id = thread::current().id();
        let existing = self.connections.get(&id).map(|c| Arc::clone(c.value()));

        if let Some(conn) = existing {
            if conn.is_open() {
                return Ok(conn);
            }
            warn!("Connection for {:?} was closed, reopening", id);
        }

        let conn = self.repository.connect()?;
        debug!("Opened connection for {:?}", id);
        self.connections.insert(id, Arc::clone(&conn));
        Ok(conn)
    }

    /// Close every connection
    pub fn close_all(&self) {
        for entry in self.connections.iter() {
            entry.value().close();
        }
        self.connections.clear();
    }

    /// Number of threads holding a connection
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    #[test]
    fn test_one_connection_per_thread() {
        let pool = Arc::new(ConnectionPool::new(Arc::new(MemoryRepository::new())));

        let a = pool.current().unwrap();
        let b = pool.current().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let pool2 = Arc::clone(&pool);
        let other = thread::spawn(move || pool2.current().unwrap()).join().unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_closed_connection_is_replaced() {
        let pool = ConnectionPool::new(Arc::new(MemoryRepository::new()));
        let first = pool.current().unwrap();
        first.close();

        let second = pool.current().unwrap();
        assert!(second.is_open());
        assert!(!Arc::ptr_eq(&first, &second));

        pool.close_all();
        assert!(pool.is_empty());
        assert!(!second.is_open());
    }
}
