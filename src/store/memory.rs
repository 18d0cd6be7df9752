//! In-memory repository
//!
//! An indexed quad store with named graphs, plus connections that implement
//! transactions with an undo log. Writes are applied immediately; rolling back
//! replays the log in reverse.

use super::{Connection, Repository, Statements, StoreError, StoreResult};
use crate::rdf::serialization::turtle;
use crate::rdf::{GraphName, NamedNode, RdfObject, RdfSubject, Statement, StatementPattern};
use crate::sparql;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Quad store with multiple indices for efficient lookups
///
/// Implements:
/// - SPO index (Subject → statements)
/// - POS index (Predicate → statements)
/// - OSP index (Object → statements)
///
/// A lookup walks the most selective index its pattern allows. Results come
/// back in insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// All statements (primary storage), with their insertion sequence
    statements: FxHashMap<Statement, u64>,

    next_seq: u64,

    spo_index: FxHashMap<RdfSubject, FxHashSet<Statement>>,

    pos_index: FxHashMap<NamedNode, FxHashSet<Statement>>,

    osp_index: FxHashMap<RdfObject, FxHashSet<Statement>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a statement; returns false if it was already present
    pub fn insert(&mut self, statement: Statement) -> bool {
        if self.statements.contains_key(&statement) {
            return false;
        }

        self.spo_index
            .entry(statement.subject.clone())
            .or_default()
            .insert(statement.clone());
        self.pos_index
            .entry(statement.predicate.clone())
            .or_default()
            .insert(statement.clone());
        self.osp_index
            .entry(statement.object.clone())
            .or_default()
            .insert(statement.clone());
        self.statements.insert(statement, self.next_seq);
        self.next_seq += 1;
        true
    }

    /// Remove a statement; returns false if it was absent
    pub fn remove(&mut self, statement: &Statement) -> bool {
        if self.statements.remove(statement).is_none() {
            return false;
        }

        remove_from_index(&mut self.spo_index, &statement.subject, statement);
        remove_from_index(&mut self.pos_index, &statement.predicate, statement);
        remove_from_index(&mut self.osp_index, &statement.object, statement);
        true
    }

    /// Check if a statement exists in the store
    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.contains_key(statement)
    }

    /// Get the total number of statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Clear all statements
    pub fn clear(&mut self) {
        self.statements.clear();
        self.spo_index.clear();
        self.pos_index.clear();
        self.osp_index.clear();
    }

    /// Statements matching a pattern within `graphs` (empty = every graph)
    pub fn query(&self, pattern: &StatementPattern, graphs: &[GraphName]) -> Vec<Statement> {
        type Candidates<'s> = Box<dyn Iterator<Item = &'s Statement> + 's>;
        let candidates: Candidates<'_> = if let Some(s) = &pattern.subject {
            match self.spo_index.get(s) {
                Some(set) => Box::new(set.iter()),
                None => return Vec::new(),
            }
        } else if let Some(o) = &pattern.object {
            match self.osp_index.get(o) {
                Some(set) => Box::new(set.iter()),
                None => return Vec::new(),
            }
        } else if let Some(p) = &pattern.predicate {
            match self.pos_index.get(p) {
                Some(set) => Box::new(set.iter()),
                None => return Vec::new(),
            }
        } else {
            Box::new(self.statements.keys())
        };

        let mut matched: Vec<(u64, &Statement)> = candidates
            .filter(|statement| pattern.matches(statement, graphs))
            .map(|statement| {
                let seq = self.statements.get(statement).copied().unwrap_or(u64::MAX);
                (seq, statement)
            })
            .collect();
        matched.sort_unstable_by_key(|(seq, _)| *seq);
        matched.into_iter().map(|(_, statement)| statement.clone()).collect()
    }

    /// Whether any statement matches the pattern
    pub fn matches_any(&self, pattern: &StatementPattern, graphs: &[GraphName]) -> bool {
        !self.query(pattern, graphs).is_empty()
    }

    /// List the named graphs that hold at least one statement
    pub fn graphs(&self) -> Vec<NamedNode> {
        self.statements
            .keys()
            .filter_map(|s| s.graph.clone())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect()
    }

    /// All statements in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        let mut ordered: Vec<(&Statement, &u64)> = self.statements.iter().collect();
        ordered.sort_unstable_by_key(|(_, seq)| **seq);
        ordered.into_iter().map(|(statement, _)| statement)
    }
}

fn remove_from_index<K: std::hash::Hash + Eq>(
    index: &mut FxHashMap<K, FxHashSet<Statement>>,
    key: &K,
    statement: &Statement,
) {
    if let Some(set) = index.get_mut(key) {
        set.remove(statement);
        if set.is_empty() {
            index.remove(key);
        }
    }
}

/// Shared in-memory repository
#[derive(Clone, Default)]
pub struct MemoryRepository {
    store: Arc<RwLock<MemoryStore>>,
    read_only: Arc<AtomicBool>,
}

impl MemoryRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a concrete connection (the [`Repository`] impl returns it boxed)
    pub fn open(&self) -> MemoryConnection {
        MemoryConnection {
            store: Arc::clone(&self.store),
            read_only: Arc::clone(&self.read_only),
            open: AtomicBool::new(true),
            undo_log: Mutex::new(None),
        }
    }

    /// Load a Turtle document into `graph`
    pub fn load_turtle(&self, input: &str, graph: GraphName) -> StoreResult<usize> {
        let statements = turtle::parse(input)?;
        let mut store = self.store.write();
        let mut added = 0;
        for mut statement in statements {
            statement.graph = graph.clone();
            if store.insert(statement) {
                added += 1;
            }
        }
        debug!("Loaded {} statements from Turtle", added);
        Ok(added)
    }

    /// Dump every statement as Turtle
    pub fn dump_turtle(&self) -> StoreResult<String> {
        let statements = self.statements();
        turtle::serialize(&statements).map_err(|e| StoreError::Io(e.to_string()))
    }

    /// Snapshot of every statement
    pub fn statements(&self) -> Vec<Statement> {
        self.store.read().iter().cloned().collect()
    }

    /// Statements matching a pattern, bypassing any connection
    pub fn query(&self, pattern: &StatementPattern, graphs: &[GraphName]) -> Vec<Statement> {
        self.store.read().query(pattern, graphs)
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Make every subsequent write fail with [`StoreError::ReadOnly`]
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl Repository for MemoryRepository {
    fn connect(&self) -> StoreResult<Arc<dyn Connection>> {
        Ok(Arc::new(self.open()))
    }
}

#[derive(Debug)]
enum Change {
    Added(Statement),
    Removed(Statement),
}

/// Connection to a [`MemoryRepository`]
pub struct MemoryConnection {
    store: Arc<RwLock<MemoryStore>>,
    read_only: Arc<AtomicBool>,
    open: AtomicBool,
    /// Some while a transaction is active
    undo_log: Mutex<Option<Vec<Change>>>,
}

impl MemoryConnection {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::ConnectionClosed)
        }
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        self.ensure_open()?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    fn record(&self, change: Change) {
        if let Some(log) = self.undo_log.lock().as_mut() {
            log.push(change);
        }
    }
}

impl Connection for MemoryConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.is_active() {
            let _ = self.rollback();
        }
        self.open.store(false, Ordering::SeqCst);
    }

    fn has_statement(&self, pattern: &StatementPattern, graphs: &[GraphName]) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.store.read().matches_any(pattern, graphs))
    }

    fn get_statements(
        &self,
        pattern: &StatementPattern,
        graphs: &[GraphName],
    ) -> StoreResult<Statements> {
        self.ensure_open()?;
        Ok(Statements::new(self.store.read().query(pattern, graphs)))
    }

    fn add_statement(
        &self,
        subject: &RdfSubject,
        predicate: &NamedNode,
        object: &RdfObject,
        graphs: &[GraphName],
    ) -> StoreResult<()> {
        self.ensure_writable()?;
        let targets: &[GraphName] = if graphs.is_empty() { &[None] } else { graphs };

        let mut store = self.store.write();
        for graph in targets {
            let statement = Statement::in_graph(
                subject.clone(),
                predicate.clone(),
                object.clone(),
                graph.clone(),
            );
            if store.insert(statement.clone()) {
                trace!("+ {}", statement);
                self.record(Change::Added(statement));
            }
        }
        Ok(())
    }

    fn remove_statements(
        &self,
        pattern: &StatementPattern,
        graphs: &[GraphName],
    ) -> StoreResult<usize> {
        self.ensure_writable()?;
        let mut store = self.store.write();
        let matched = store.query(pattern, graphs);
        for statement in &matched {
            store.remove(statement);
            trace!("- {}", statement);
        }
        let removed = matched.len();
        for statement in matched {
            self.record(Change::Removed(statement));
        }
        Ok(removed)
    }

    fn begin(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let mut log = self.undo_log.lock();
        if log.is_some() {
            return Err(StoreError::TransactionActive);
        }
        *log = Some(Vec::new());
        Ok(())
    }

    fn commit(&self) -> StoreResult<()> {
        self.ensure_open()?;
        match self.undo_log.lock().take() {
            Some(log) => {
                trace!("Committed {} changes", log.len());
                Ok(())
            }
            None => Err(StoreError::NoActiveTransaction),
        }
    }

    fn rollback(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let log = self
            .undo_log
            .lock()
            .take()
            .ok_or(StoreError::NoActiveTransaction)?;

        let mut store = self.store.write();
        for change in log.into_iter().rev() {
            match change {
                Change::Added(statement) => {
                    store.remove(&statement);
                }
                Change::Removed(statement) => {
                    store.insert(statement);
                }
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.undo_log.lock().is_some()
    }

    fn evaluate_graph_query(&self, query: &str) -> StoreResult<Vec<Statement>> {
        self.ensure_open()?;
        let store = self.store.read();
        Ok(sparql::construct(&store, query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::Literal;

    fn alice() -> RdfSubject {
        NamedNode::new("http://example.org/alice").unwrap().into()
    }

    fn name() -> NamedNode {
        NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap()
    }

    #[test]
    fn test_insert_and_query() {
        let mut store = MemoryStore::new();
        let alice_name = Literal::new_simple_literal("Alice");
        let statement = Statement::new(alice(), name(), alice_name.into());

        assert!(store.insert(statement.clone()));
        assert!(!store.insert(statement.clone()));
        assert_eq!(store.len(), 1);

        let found = store.query(&StatementPattern::forward(&alice(), &name()), &[]);
        assert_eq!(found, vec![statement.clone()]);

        assert!(store.remove(&statement));
        assert!(store.is_empty());
        assert!(store.query(&StatementPattern::forward(&alice(), &name()), &[]).is_empty());
    }

    #[test]
    fn test_query_preserves_insertion_order() {
        let mut store = MemoryStore::new();
        let objects: Vec<RdfObject> = ["c", "a", "b"]
            .iter()
            .map(|v| Literal::new_simple_literal(*v).into())
            .collect();
        for object in &objects {
            store.insert(Statement::new(alice(), name(), object.clone()));
        }
        let found: Vec<_> = store
            .query(&StatementPattern::forward(&alice(), &name()), &[])
            .into_iter()
            .map(|s| s.object)
            .collect();
        assert_eq!(found, objects);
    }

    #[test]
    fn test_graph_restriction() {
        let repo = MemoryRepository::new();
        let conn = repo.open();
        let g1 = Some(NamedNode::new("http://example.org/g1").unwrap());
        let g2 = Some(NamedNode::new("http://example.org/g2").unwrap());
        let object: RdfObject = Literal::new_simple_literal("Alice").into();

        conn.add_statement(&alice(), &name(), &object, &[g1.clone(), g2.clone()])
            .unwrap();
        assert_eq!(repo.len(), 2);

        let pattern = StatementPattern::forward(&alice(), &name());
        assert!(conn.has_statement(&pattern, &[g1.clone()]).unwrap());
        assert!(!conn.has_statement(&pattern, &[None]).unwrap());

        assert_eq!(conn.remove_statements(&pattern, &[g1]).unwrap(), 1);
        assert_eq!(conn.get_statements(&pattern, &[]).unwrap().count(), 1);
        assert_eq!(repo.open().get_statements(&pattern, &[g2]).unwrap().count(), 1);
    }

    #[test]
    fn test_transaction_rollback_restores_state() {
        let repo = MemoryRepository::new();
        let conn = repo.open();
        let keep: RdfObject = Literal::new_simple_literal("keep").into();
        let temp: RdfObject = Literal::new_simple_literal("temp").into();
        conn.add_statement(&alice(), &name(), &keep, &[]).unwrap();

        conn.begin().unwrap();
        assert!(conn.is_active());
        assert!(matches!(conn.begin(), Err(StoreError::TransactionActive)));
        conn.remove_statements(&StatementPattern::forward(&alice(), &name()), &[])
            .unwrap();
        conn.add_statement(&alice(), &name(), &temp, &[]).unwrap();
        conn.rollback().unwrap();

        assert!(!conn.is_active());
        let values: Vec<_> = repo.statements().into_iter().map(|s| s.object).collect();
        assert_eq!(values, vec![keep]);
        assert!(matches!(conn.commit(), Err(StoreError::NoActiveTransaction)));
    }

    #[test]
    fn test_closed_connection_rejects_calls() {
        let repo = MemoryRepository::new();
        let conn = repo.open();
        conn.close();
        assert!(!conn.is_open());
        assert!(matches!(
            conn.has_statement(&StatementPattern::default(), &[]),
            Err(StoreError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let repo = MemoryRepository::new();
        repo.set_read_only(true);
        let conn = repo.open();
        let object: RdfObject = Literal::new_simple_literal("x").into();
        assert!(matches!(
            conn.add_statement(&alice(), &name(), &object, &[]),
            Err(StoreError::ReadOnly)
        ));
    }

    #[test]
    fn test_turtle_round_trip() {
        let repo = MemoryRepository::new();
        let added = repo
            .load_turtle(
                r#"<http://example.org/alice> <http://xmlns.com/foaf/0.1/name> "Alice" ."#,
                None,
            )
            .unwrap();
        assert_eq!(added, 1);
        assert!(repo.dump_turtle().unwrap().contains("Alice"));
    }
}
