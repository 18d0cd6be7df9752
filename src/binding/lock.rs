//! Per-node read/write locks
//!
//! Every graph node gets one [`NodeLock`], created on first request. The lock
//! is reentrant: a thread holding the write lock may take it again (marshalling
//! cyclic graphs revisits nodes) or take a read lock under it, and a thread
//! that is the sole reader may upgrade to writing.
//!
//! Writers are preferred: once a writer waits, new readers queue behind it
//! unless they already hold a read lock on the node.
//!
//! Locks taken on several nodes are not ordered. Two threads writing two
//! nodes in opposite order can deadlock.

use crate::rdf::RdfSubject;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::trace;

#[derive(Default)]
struct LockState {
    writer: Option<ThreadId>,
    write_depth: usize,
    readers: FxHashMap<ThreadId, usize>,
    waiting_writers: usize,
}

impl LockState {
    fn holds_read(&self, me: ThreadId) -> bool {
        self.readers.contains_key(&me)
    }

    fn can_read(&self, me: ThreadId) -> bool {
        match self.writer {
            Some(writer) => writer == me,
            None => self.waiting_writers == 0 || self.holds_read(me),
        }
    }

    fn can_write(&self, me: ThreadId) -> bool {
        match self.writer {
            Some(writer) => writer == me,
            None => self.readers.keys().all(|reader| *reader == me),
        }
    }
}

/// Reentrant, upgradeable read/write lock
#[derive(Default)]
pub struct NodeLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl NodeLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_read(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while !state.can_read(me) {
            self.released.wait(&mut state);
        }
        *state.readers.entry(me).or_insert(0) += 1;
    }

    fn unlock_read(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if let Some(count) = state.readers.get_mut(&me) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&me);
            }
        }
        drop(state);
        self.released.notify_all();
    }

    fn lock_write(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if !state.can_write(me) {
            state.waiting_writers += 1;
            while !state.can_write(me) {
                self.released.wait(&mut state);
            }
            state.waiting_writers -= 1;
        }
        state.writer = Some(me);
        state.write_depth += 1;
    }

    fn unlock_write(&self) {
        let mut state = self.state.lock();
        state.write_depth = state.write_depth.saturating_sub(1);
        if state.write_depth == 0 {
            state.writer = None;
        }
        drop(state);
        self.released.notify_all();
    }

    /// Whether any thread holds the lock
    pub fn is_locked(&self) -> bool {
        let state = self.state.lock();
        state.writer.is_some() || !state.readers.is_empty()
    }

    /// Whether the calling thread holds the write lock
    pub fn is_write_locked_by_current(&self) -> bool {
        self.state.lock().writer == Some(thread::current().id())
    }
}

/// Shared read access; released on drop
///
/// Guards are tied to the acquiring thread.
pub struct ReadGuard {
    lock: Arc<NodeLock>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.lock.unlock_read();
    }
}

/// Exclusive write access; released on drop
pub struct WriteGuard {
    lock: Arc<NodeLock>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.lock.unlock_write();
    }
}

/// Write locks taken over one operation, all released together on drop
///
/// Each node is locked at most once per set, however often it is requested.
pub struct WriteLocks<'a> {
    registry: &'a LockRegistry,
    held: FxHashMap<RdfSubject, WriteGuard>,
}

impl<'a> WriteLocks<'a> {
    pub fn new(registry: &'a LockRegistry) -> Self {
        Self {
            registry,
            held: FxHashMap::default(),
        }
    }

    /// Write-lock `node` until this set is dropped
    pub fn acquire(&mut self, node: &RdfSubject) {
        if !self.held.contains_key(node) {
            let guard = self.registry.write(node);
            self.held.insert(node.clone(), guard);
        }
    }

    pub fn holds(&self, node: &RdfSubject) -> bool {
        self.held.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Node → lock table
#[derive(Default)]
pub struct LockRegistry {
    locks: DashMap<RdfSubject, Arc<NodeLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `node`, created atomically on first request
    pub fn get(&self, node: &RdfSubject) -> Arc<NodeLock> {
        if let Some(lock) = self.locks.get(node) {
            return Arc::clone(lock.value());
        }
        Arc::clone(self.locks.entry(node.clone()).or_default().value())
    }

    pub fn read(&self, node: &RdfSubject) -> ReadGuard {
        let lock = self.get(node);
        lock.lock_read();
        trace!("read lock {}", node);
        ReadGuard {
            lock,
            _not_send: PhantomData,
        }
    }

    pub fn write(&self, node: &RdfSubject) -> WriteGuard {
        let lock = self.get(node);
        lock.lock_write();
        trace!("write lock {}", node);
        WriteGuard {
            lock,
            _not_send: PhantomData,
        }
    }

    /// Drop locks nobody holds or waits on; returns how many were dropped
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
