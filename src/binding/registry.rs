//! Binding registry
//!
//! The entry point applications use. A registry owns the process-wide state
//! (descriptor table, node locks, proxy cache, per-thread connections) and
//! the transaction discipline: every write runs inside the calling thread's
//! transaction if one is active, and otherwise in one the registry opens,
//! commits, or rolls back on failure.

use super::codec::{LiteralCodec, XsdLiteralCodec};
use super::container;
use super::descriptor::{DescriptorRegistry, TypeDescriptor};
use super::engine::{CreatedListener, Engine};
use super::error::{BindingError, BindingResult};
use super::lock::LockRegistry;
use super::proxy::{LiveProxy, ProxyNodeCache};
use super::reader::GraphReader;
use super::value::{Instance, Value};
use super::writer::GraphWriter;
use crate::config::BindingConfig;
use crate::rdf::{vocab, GraphName, RdfObject, RdfSubject, StatementPattern};
use crate::store::{Connection, ConnectionPool, Repository, Statements};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Builder for [`BindingRegistry`]
pub struct RegistryBuilder {
    repository: Arc<dyn Repository>,
    descriptors: Arc<DescriptorRegistry>,
    config: BindingConfig,
    codec: Arc<dyn LiteralCodec>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn codec(mut self, codec: Arc<dyn LiteralCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn build(self) -> BindingResult<BindingRegistry> {
        let default_graphs = self.config.graphs()?;
        let binding_class = self.config.binding_class_predicate()?;
        info!(
            "Binding registry ready ({} descriptors, {} default graphs)",
            self.descriptors.len(),
            default_graphs.len()
        );

        Ok(BindingRegistry {
            engine: Arc::new(Engine {
                config: self.config,
                default_graphs,
                binding_class,
                descriptors: self.descriptors,
                locks: LockRegistry::new(),
                proxies: ProxyNodeCache::new(),
                pool: ConnectionPool::new(self.repository),
                codec: self.codec,
                listeners: RwLock::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }
}

/// Facade over the mapping engine
pub struct BindingRegistry {
    engine: Arc<Engine>,
}

impl BindingRegistry {
    /// Registry with the default configuration and XSD codec
    pub fn new(
        repository: Arc<dyn Repository>,
        descriptors: Arc<DescriptorRegistry>,
    ) -> BindingResult<Self> {
        Self::builder(repository, descriptors).build()
    }

    pub fn builder(
        repository: Arc<dyn Repository>,
        descriptors: Arc<DescriptorRegistry>,
    ) -> RegistryBuilder {
        RegistryBuilder {
            repository,
            descriptors,
            config: BindingConfig::default(),
            codec: Arc::new(XsdLiteralCodec),
        }
    }

    pub fn descriptors(&self) -> &DescriptorRegistry {
        &self.engine.descriptors
    }

    pub fn config(&self) -> &BindingConfig {
        &self.engine.config
    }

    /// The calling thread's connection
    pub fn connection(&self) -> BindingResult<Arc<dyn Connection>> {
        self.engine.connection()
    }

    /// Number of node locks currently tracked
    pub fn lock_count(&self) -> usize {
        self.engine.locks.len()
    }

    // Transactions on the calling thread's connection

    pub fn begin(&self) -> BindingResult<()> {
        self.connection()?.begin()?;
        debug!("Transaction opened");
        Ok(())
    }

    pub fn commit(&self) -> BindingResult<()> {
        self.connection()?.commit()?;
        debug!("Transaction committed");
        Ok(())
    }

    pub fn rollback(&self) -> BindingResult<()> {
        self.connection()?.rollback()?;
        debug!("Transaction rolled back");
        Ok(())
    }

    pub fn is_active(&self) -> BindingResult<bool> {
        Ok(self.connection()?.is_active())
    }

    // Writing objects

    /// Store `object` unless its node already has statements; returns its node
    pub fn add(&self, object: &Instance) -> BindingResult<RdfSubject> {
        self.add_in(object, &self.engine.default_graphs)
    }

    pub fn add_in(&self, object: &Instance, graphs: &[GraphName]) -> BindingResult<RdfSubject> {
        self.marshal(object, graphs, false)
    }

    /// Store `object`, replacing whatever its node held before
    pub fn update(&self, object: &Instance) -> BindingResult<RdfSubject> {
        self.update_in(object, &self.engine.default_graphs)
    }

    pub fn update_in(&self, object: &Instance, graphs: &[GraphName]) -> BindingResult<RdfSubject> {
        self.marshal(object, graphs, true)
    }

    fn marshal(
        &self,
        object: &Instance,
        graphs: &[GraphName],
        update: bool,
    ) -> BindingResult<RdfSubject> {
        let conn = self.connection()?;
        let what = if update { "update" } else { "add" };
        let mut writer = GraphWriter::new(&self.engine, conn.as_ref(), graphs, update);
        let node = self
            .engine
            .in_transaction(conn.as_ref(), what, || writer.marshal(object))?;
        drop(writer);
        Ok(node)
    }

    // Reading objects

    /// Rebuild the object at `node`, typed from binding-class metadata
    pub fn get(&self, node: &RdfSubject) -> BindingResult<Option<Instance>> {
        self.get_in(node, None, &self.engine.default_graphs)
    }

    /// Rebuild the object at `node` as the named type
    pub fn get_as(&self, node: &RdfSubject, type_name: &str) -> BindingResult<Option<Instance>> {
        self.get_in(node, Some(type_name), &self.engine.default_graphs)
    }

    pub fn get_in(
        &self,
        node: &RdfSubject,
        type_name: Option<&str>,
        graphs: &[GraphName],
    ) -> BindingResult<Option<Instance>> {
        let descriptor = type_name.map(|name| self.descriptor(name)).transpose()?;
        let conn = self.connection()?;
        GraphReader::new(&self.engine, conn.as_ref(), graphs).unmarshal(node, descriptor)
    }

    /// Rebuild the object with identifier `id`
    pub fn get_resource(&self, id: &str, type_name: &str) -> BindingResult<Option<Instance>> {
        let node = self.resource_of(id, type_name)?;
        self.get_as(&node, type_name)
    }

    /// The node an identifier maps to under a type's namespace
    pub fn resource_of(&self, id: &str, type_name: &str) -> BindingResult<RdfSubject> {
        let descriptor = self.descriptor(type_name)?;
        descriptor
            .node_for_id(&Value::from(id))?
            .ok_or_else(|| BindingError::NotFound(id.to_string()))
    }

    /// Whether `node` has any statements
    pub fn exists(&self, node: &RdfSubject) -> BindingResult<bool> {
        self.exists_in(node, &self.engine.default_graphs)
    }

    pub fn exists_in(&self, node: &RdfSubject, graphs: &[GraphName]) -> BindingResult<bool> {
        let conn = self.connection()?;
        let _guard = self.engine.locks.read(node);
        Ok(conn.has_statement(&StatementPattern::new(Some(node.clone()), None, None), graphs)?)
    }

    /// Lazily rebuild every node typed as `type_name`
    pub fn get_all(&self, type_name: &str) -> BindingResult<Objects> {
        self.get_all_in(type_name, &self.engine.default_graphs)
    }

    pub fn get_all_in(&self, type_name: &str, graphs: &[GraphName]) -> BindingResult<Objects> {
        let descriptor = self.descriptor(type_name)?;
        Ok(Objects {
            nodes: self.typed_nodes(&descriptor, graphs)?,
            engine: Arc::clone(&self.engine),
            descriptor,
            graphs: graphs.to_vec(),
        })
    }

    // Deleting

    /// Remove every statement with `node` as subject or object
    pub fn delete(&self, node: &RdfSubject) -> BindingResult<()> {
        self.delete_in(node, &self.engine.default_graphs)
    }

    pub fn delete_in(&self, node: &RdfSubject, graphs: &[GraphName]) -> BindingResult<()> {
        let conn = self.connection()?;
        let _guard = self.engine.locks.write(node);
        let removed = self.engine.in_transaction(conn.as_ref(), "delete", || {
            let subject_pattern = StatementPattern::new(Some(node.clone()), None, None);

            let objects: Vec<RdfObject> = conn
                .get_statements(&subject_pattern, graphs)?
                .map(|s| s.object)
                .collect();
            let mut visited = FxHashSet::default();
            for object in &objects {
                container::remove_structure(conn.as_ref(), object, graphs, &mut visited)?;
            }

            let mut removed = conn.remove_statements(&subject_pattern, graphs)?;
            removed += conn.remove_statements(
                &StatementPattern::new(None, None, Some(node.clone().into())),
                graphs,
            )?;
            Ok(removed)
        })?;

        self.engine.proxies.purge(node);
        debug!("Deleted {} ({} statements)", node, removed);
        Ok(())
    }

    pub fn delete_resource(&self, id: &str, type_name: &str) -> BindingResult<()> {
        let node = self.resource_of(id, type_name)?;
        self.delete(&node)
    }

    // Live proxies

    /// Live proxy for `node`, typing the node first if it has no statements
    pub fn create(&self, node: &RdfSubject, type_name: &str) -> BindingResult<LiveProxy> {
        self.create_in(node, type_name, &self.engine.default_graphs)
    }

    pub fn create_in(
        &self,
        node: &RdfSubject,
        type_name: &str,
        graphs: &[GraphName],
    ) -> BindingResult<LiveProxy> {
        let descriptor = self.descriptor(type_name)?;
        let conn = self.connection()?;

        let mut writer = GraphWriter::new(&self.engine, conn.as_ref(), graphs, false);
        writer.lock(node);
        let created = self.engine.in_transaction(conn.as_ref(), "create", || {
            let exists =
                conn.has_statement(&StatementPattern::new(Some(node.clone()), None, None), graphs)?;
            if exists {
                return Ok(false);
            }
            conn.add_statement(
                node,
                &vocab::rdf_type(),
                &descriptor.rdf_type.clone().into(),
                graphs,
            )?;
            writer.write_binding_class(&descriptor)?;
            Ok(true)
        })?;
        drop(writer);

        let proxy = self.engine.proxies.get_or_create(&self.engine, node, descriptor, graphs);
        if created {
            debug!("Created {} {}", proxy.type_name(), node);
            self.engine.notify_created(&proxy);
        }
        Ok(proxy)
    }

    /// Live proxy for the node with identifier `id`
    pub fn create_resource(&self, id: &str, type_name: &str) -> BindingResult<LiveProxy> {
        let node = self.resource_of(id, type_name)?;
        self.create(&node, type_name)
    }

    /// Live proxy for an existing node; None if the node has no statements
    pub fn get_proxy(
        &self,
        node: &RdfSubject,
        type_name: Option<&str>,
    ) -> BindingResult<Option<LiveProxy>> {
        let graphs = &self.engine.default_graphs;
        if let Some(proxy) = self.engine.proxies.get(node) {
            return Ok(Some(proxy));
        }
        if !self.exists_in(node, graphs)? {
            return Ok(None);
        }
        let descriptor = match type_name {
            Some(name) => self.descriptor(name)?,
            None => {
                let conn = self.connection()?;
                GraphReader::new(&self.engine, conn.as_ref(), graphs).resolve_descriptor(node)?
            }
        };
        Ok(Some(self.engine.proxies.get_or_create(&self.engine, node, descriptor, graphs)))
    }

    /// Lazily produce live proxies for every node typed as `type_name`
    pub fn create_all(&self, type_name: &str) -> BindingResult<Proxies> {
        self.create_all_in(type_name, &self.engine.default_graphs)
    }

    pub fn create_all_in(&self, type_name: &str, graphs: &[GraphName]) -> BindingResult<Proxies> {
        let descriptor = self.descriptor(type_name)?;
        Ok(Proxies {
            nodes: self.typed_nodes(&descriptor, graphs)?,
            engine: Arc::clone(&self.engine),
            descriptor,
            graphs: graphs.to_vec(),
        })
    }

    /// Run `listener` once for every node `create` makes
    pub fn add_listener(&self, listener: impl Fn(&LiveProxy) + Send + Sync + 'static) {
        let listener: CreatedListener = Arc::new(listener);
        self.engine.listeners.write().push(listener);
    }

    pub fn clear_listeners(&self) {
        self.engine.listeners.write().clear();
    }

    /// Close every connection; later calls fail with a closed-connection error
    pub fn close(&self) {
        if self.engine.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.engine.pool.close_all();
        let swept = self.engine.proxies.sweep();
        let pruned = if self.engine.config.prune_locks_on_close {
            self.engine.locks.prune()
        } else {
            0
        };
        info!("Binding registry closed ({} locks pruned, {} proxies swept)", pruned, swept);
    }

    pub fn is_closed(&self) -> bool {
        self.engine.closed.load(Ordering::SeqCst)
    }

    fn descriptor(&self, type_name: &str) -> BindingResult<Arc<TypeDescriptor>> {
        self.engine.descriptors.resolve(type_name)
    }

    fn typed_nodes(
        &self,
        descriptor: &TypeDescriptor,
        graphs: &[GraphName],
    ) -> BindingResult<TypedNodes> {
        let conn = self.connection()?;
        let pattern = StatementPattern::new(
            None,
            Some(vocab::rdf_type()),
            Some(descriptor.rdf_type.clone().into()),
        );
        Ok(TypedNodes {
            statements: conn.get_statements(&pattern, graphs)?,
            seen: FxHashSet::default(),
        })
    }
}

/// Distinct subjects of a type lookup
struct TypedNodes {
    statements: Statements,
    seen: FxHashSet<RdfSubject>,
}

impl TypedNodes {
    fn next_node(&mut self) -> Option<RdfSubject> {
        for statement in self.statements.by_ref() {
            if self.seen.insert(statement.subject.clone()) {
                return Some(statement.subject);
            }
        }
        None
    }
}

/// Lazy sequence of rebuilt objects; each is decoded when the iterator advances
pub struct Objects {
    engine: Arc<Engine>,
    descriptor: Arc<TypeDescriptor>,
    graphs: Vec<GraphName>,
    nodes: TypedNodes,
}

impl Objects {
    /// Stop the sequence; later calls to `next` return None
    pub fn close(&mut self) {
        self.nodes.statements.close();
    }
}

impl Iterator for Objects {
    type Item = BindingResult<Instance>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.nodes.next_node()?;
            let conn = match self.engine.connection() {
                Ok(conn) => conn,
                Err(e) => return Some(Err(e)),
            };
            let mut reader = GraphReader::new(&self.engine, conn.as_ref(), &self.graphs);
            match reader.unmarshal(&node, Some(Arc::clone(&self.descriptor))) {
                Ok(Some(object)) => return Some(Ok(object)),
                // Deleted since the sequence was opened
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Lazy sequence of live proxies
pub struct Proxies {
    engine: Arc<Engine>,
    descriptor: Arc<TypeDescriptor>,
    graphs: Vec<GraphName>,
    nodes: TypedNodes,
}

impl Proxies {
    pub fn close(&mut self) {
        self.nodes.statements.close();
    }
}

impl Iterator for Proxies {
    type Item = LiveProxy;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.next_node()?;
        Some(self.engine.proxies.get_or_create(
            &self.engine,
            &node,
            Arc::clone(&self.descriptor),
            &self.graphs,
        ))
    }
}

impl Drop for BindingRegistry {
    fn drop(&mut self) {
        self.close();
    }
}
