//! Live proxies
//!
//! A [`LiveProxy`] is a view of one node: every `get` reads a single property
//! from the store and every `set` rewrites it, so nothing is materialized
//! beyond what is asked for. [`ProxyNodeCache`] keeps at most one proxy per
//! node alive at a time, holding them weakly.

use super::descriptor::TypeDescriptor;
use super::engine::Engine;
use super::error::{BindingError, BindingResult};
use super::reader::GraphReader;
use super::value::{Bound, Instance, Value};
use super::writer::GraphWriter;
use crate::rdf::{GraphName, RdfSubject};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

pub(crate) struct ProxyInner {
    engine: Arc<Engine>,
    node: RdfSubject,
    descriptor: Arc<TypeDescriptor>,
    graphs: Vec<GraphName>,
    deleted: AtomicBool,
}

/// Store-backed view of one node
#[derive(Clone)]
pub struct LiveProxy {
    inner: Arc<ProxyInner>,
}

impl LiveProxy {
    pub fn node(&self) -> &RdfSubject {
        &self.inner.node
    }

    pub fn descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(&self.inner.descriptor)
    }

    pub fn type_name(&self) -> &str {
        &self.inner.descriptor.name
    }

    /// Partitions this proxy reads and writes
    pub fn graphs(&self) -> &[GraphName] {
        &self.inner.graphs
    }

    /// Identifier derived from the node (None for blank nodes)
    pub fn id(&self) -> Option<String> {
        self.inner.descriptor.id_for_node(&self.inner.node)
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_live(&self) -> BindingResult<()> {
        if self.is_deleted() {
            return Err(BindingError::NotFound(self.inner.node.to_string()));
        }
        Ok(())
    }

    /// Current value of one property
    pub fn get(&self, property: &str) -> BindingResult<Value> {
        self.ensure_live()?;
        let descriptor = &self.inner.descriptor;
        if descriptor.is_subject_property(property) {
            return Ok(descriptor.id_value_for_node(&self.inner.node).unwrap_or(Value::Null));
        }
        let property = descriptor.require(property)?;

        let engine = &self.inner.engine;
        let conn = engine.connection()?;
        let mut reader = GraphReader::live(engine, conn.as_ref(), &self.inner.graphs);
        let terms = {
            let _guard = engine.locks.read(&self.inner.node);
            reader.property_terms(&self.inner.node, property)?
        };
        reader.decode_terms(property, terms)
    }

    /// Replace one property's value in the store
    pub fn set(&self, property: &str, value: impl Into<Value>) -> BindingResult<()> {
        self.ensure_live()?;
        let value = value.into();
        let descriptor = &self.inner.descriptor;
        if descriptor.is_subject_property(property) {
            return Err(BindingError::mapping(
                &descriptor.name,
                property,
                "the identifier of a stored node cannot change",
            ));
        }
        let property = descriptor.require(property)?;
        self.check_partition(property.name.as_str(), &value)?;

        let engine = &self.inner.engine;
        let node = &self.inner.node;
        let graphs = self.inner.graphs.as_slice();
        let conn = engine.connection()?;
        let mut writer = GraphWriter::new(engine, conn.as_ref(), graphs, false);
        writer.lock(node);
        engine.in_transaction(conn.as_ref(), "proxy set", || {
            self.ensure_live()?;
            writer.clear_property(node, property)?;
            writer.write_property(node, descriptor, property, &value)
        })?;
        drop(writer);
        trace!("Set {}.{} on {}", descriptor.name, property.name, node);
        Ok(())
    }

    pub fn get_at(&self, property: &str, index: usize) -> BindingResult<Value> {
        Bound::get_at(self, property, index)
    }

    pub fn set_at(
        &self,
        property: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> BindingResult<()> {
        Bound::set_at(self, property, index, value.into())
    }

    /// Detached copy of the node's current state
    pub fn materialize(&self) -> BindingResult<Instance> {
        self.ensure_live()?;
        let engine = &self.inner.engine;
        let conn = engine.connection()?;
        GraphReader::new(engine, conn.as_ref(), &self.inner.graphs)
            .unmarshal(&self.inner.node, Some(self.descriptor()))?
            .ok_or_else(|| BindingError::NotFound(self.inner.node.to_string()))
    }

    /// Bound values must live in the same partitions as this proxy
    fn check_partition(&self, property: &str, value: &Value) -> BindingResult<()> {
        match value {
            Value::Proxy(other) if other.graphs() != self.graphs() => Err(BindingError::mapping(
                self.type_name(),
                property,
                format!("{} belongs to a different graph partition", other.node()),
            )),
            Value::List(items) => items
                .iter()
                .try_for_each(|item| self.check_partition(property, item)),
            _ => Ok(()),
        }
    }

    fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::SeqCst);
    }
}

impl PartialEq for LiveProxy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LiveProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiveProxy({} {})", self.inner.descriptor.name, self.inner.node)
    }
}

impl Bound for LiveProxy {
    fn descriptor(&self) -> Arc<TypeDescriptor> {
        LiveProxy::descriptor(self)
    }

    fn get(&self, property: &str) -> BindingResult<Value> {
        LiveProxy::get(self, property)
    }

    fn set(&self, property: &str, value: Value) -> BindingResult<()> {
        LiveProxy::set(self, property, value)
    }
}

/// Node → live proxy, held weakly
#[derive(Default)]
pub struct ProxyNodeCache {
    proxies: DashMap<RdfSubject, Weak<ProxyInner>>,
}

impl ProxyNodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live proxy for `node`, created if none is alive
    pub(crate) fn get_or_create(
        &self,
        engine: &Arc<Engine>,
        node: &RdfSubject,
        descriptor: Arc<TypeDescriptor>,
        graphs: &[GraphName],
    ) -> LiveProxy {
        let mut entry = self.proxies.entry(node.clone()).or_default();
        if let Some(inner) = entry.upgrade() {
            if !inner.deleted.load(Ordering::SeqCst) {
                return LiveProxy { inner };
            }
        }

        let inner = Arc::new(ProxyInner {
            engine: Arc::clone(engine),
            node: node.clone(),
            descriptor,
            graphs: graphs.to_vec(),
            deleted: AtomicBool::new(false),
        });
        *entry = Arc::downgrade(&inner);
        LiveProxy { inner }
    }

    /// The live proxy for `node`, if one exists
    pub fn get(&self, node: &RdfSubject) -> Option<LiveProxy> {
        let inner = self.proxies.get(node)?.upgrade()?;
        let proxy = LiveProxy { inner };
        (!proxy.is_deleted()).then_some(proxy)
    }

    /// Forget `node`, marking an outstanding proxy deleted
    pub fn purge(&self, node: &RdfSubject) -> bool {
        match self.proxies.remove(node) {
            Some((_, weak)) => {
                if let Some(inner) = weak.upgrade() {
                    LiveProxy { inner }.mark_deleted();
                }
                true
            }
            None => false,
        }
    }

    /// Drop entries whose proxies are gone; returns how many were dropped
    pub fn sweep(&self) -> usize {
        let before = self.proxies.len();
        self.proxies.retain(|_, weak| weak.strong_count() > 0);
        before - self.proxies.len()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
