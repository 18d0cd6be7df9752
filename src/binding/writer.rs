//! Object graph → statements

use super::container;
use super::descriptor::{ContainerKind, PropertyDescriptor, TypeDescriptor};
use super::engine::Engine;
use super::error::{BindingError, BindingResult};
use super::identity::MarshalCache;
use super::lock::WriteLocks;
use super::value::{Instance, Value};
use crate::rdf::{vocab, BlankNode, GraphName, Literal, RdfObject, RdfSubject, StatementPattern};
use crate::store::Connection;
use tracing::{debug, trace};

/// Writes one object graph into the store
///
/// A writer is scoped to a single top-level call: its identity cache makes
/// every object map to exactly one node, so shared references are written
/// once and cycles terminate. Within a call an object is written at most
/// once, whatever the update flag.
///
/// Every node the writer changes stays write-locked until the writer is
/// dropped. Callers keep it alive past commit or rollback so no reader sees
/// a half-written node.
pub struct GraphWriter<'a> {
    engine: &'a Engine,
    conn: &'a dyn Connection,
    graphs: &'a [GraphName],
    update: bool,
    cache: MarshalCache,
    locks: WriteLocks<'a>,
}

impl<'a> GraphWriter<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        conn: &'a dyn Connection,
        graphs: &'a [GraphName],
        update: bool,
    ) -> Self {
        Self {
            engine,
            conn,
            graphs,
            update,
            cache: MarshalCache::new(),
            locks: WriteLocks::new(&engine.locks),
        }
    }

    /// Write-lock `node` for the rest of this writer's life
    pub(crate) fn lock(&mut self, node: &RdfSubject) {
        self.locks.acquire(node);
    }

    /// Remove one property's current value from `node`
    pub(crate) fn clear_property(
        &mut self,
        node: &RdfSubject,
        property: &PropertyDescriptor,
    ) -> BindingResult<()> {
        self.locks.acquire(node);
        if property.inverse {
            container::clear_inverse(self.conn, &mut self.locks, node, property, self.graphs)?;
        } else {
            container::clear_forward(self.conn, node, property, self.graphs)?;
        }
        Ok(())
    }

    /// Write `object` (and everything it references); returns its node
    pub fn marshal(&mut self, object: &Instance) -> BindingResult<RdfSubject> {
        if let Some(node) = self.cache.get(object) {
            return Ok(node.clone());
        }

        let descriptor = object.descriptor();
        let node = match descriptor.node_for_id(&object.id())? {
            Some(node) => node,
            None => BlankNode::new().into(),
        };
        self.cache.insert(object, node.clone());

        self.locks.acquire(&node);
        let exists = self
            .conn
            .has_statement(&StatementPattern::new(Some(node.clone()), None, None), self.graphs)?;
        if exists {
            if !self.update {
                trace!("{} already stored, leaving unchanged", node);
                return Ok(node);
            }
            self.clear_node(&node, &descriptor)?;
        }

        self.conn.add_statement(
            &node,
            &vocab::rdf_type(),
            &descriptor.rdf_type.clone().into(),
            self.graphs,
        )?;
        self.write_binding_class(&descriptor)?;

        for property in &descriptor.properties {
            let value = object.raw(&property.name);
            self.write_property(&node, &descriptor, property, &value)?;
        }

        debug!("Marshalled {} as {}", descriptor.name, node);
        Ok(node)
    }

    /// Remove what a previous write of `node` left behind
    fn clear_node(&mut self, node: &RdfSubject, descriptor: &TypeDescriptor) -> BindingResult<()> {
        for property in descriptor.properties.iter().filter(|p| !p.inverse && p.is_collection()) {
            container::clear_forward(self.conn, node, property, self.graphs)?;
        }
        let own = StatementPattern::new(Some(node.clone()), None, None);
        self.conn.remove_statements(&own, self.graphs)?;
        for property in descriptor.properties.iter().filter(|p| p.inverse) {
            container::clear_inverse(self.conn, &mut self.locks, node, property, self.graphs)?;
        }
        Ok(())
    }

    /// Record the binding class of a type, once per RDF type
    pub(crate) fn write_binding_class(&self, descriptor: &TypeDescriptor) -> BindingResult<()> {
        let class: RdfSubject = descriptor.rdf_type.clone().into();
        // Class metadata is add-only; this lock is released on return
        let _guard = self.engine.locks.write(&class);

        let pattern = StatementPattern::forward(&class, &self.engine.binding_class);
        if self.conn.has_statement(&pattern, self.graphs)? {
            return Ok(());
        }

        self.conn.add_statement(
            &class,
            &self.engine.binding_class,
            &Literal::new_simple_literal(descriptor.name.as_str()).into(),
            self.graphs,
        )?;
        if self.engine.config.write_supertypes {
            for supertype in &descriptor.supertypes {
                self.conn.add_statement(
                    &class,
                    &vocab::rdfs_sub_class_of(),
                    &supertype.clone().into(),
                    self.graphs,
                )?;
            }
        }
        debug!("Recorded binding class {} for {}", descriptor.name, class);
        Ok(())
    }

    /// Write one property's value for `node`
    ///
    /// The caller has locked the node and cleared any previous value.
    pub(crate) fn write_property(
        &mut self,
        node: &RdfSubject,
        descriptor: &TypeDescriptor,
        property: &PropertyDescriptor,
        value: &Value,
    ) -> BindingResult<()> {
        if property.inverse && property.container != ContainerKind::None {
            return Err(BindingError::mapping(
                &descriptor.name,
                &property.name,
                "an inverse property cannot use a container",
            ));
        }

        let elements: Vec<&Value> = match value {
            Value::Null => return Ok(()),
            Value::List(items) if property.is_collection() => {
                items.iter().filter(|v| !v.is_null()).collect()
            }
            Value::List(_) => {
                return Err(BindingError::mapping(
                    &descriptor.name,
                    &property.name,
                    "collection value for a scalar property",
                ))
            }
            single => vec![single],
        };

        if property.inverse {
            for element in elements {
                let target = self.to_resource(descriptor, property, element)?;
                if &target == node {
                    continue;
                }
                self.locks.acquire(&target);
                let object: RdfObject = node.clone().into();
                self.conn
                    .add_statement(&target, &property.predicate, &object, self.graphs)?;
            }
            return Ok(());
        }

        let mut terms = Vec::with_capacity(elements.len());
        for element in elements {
            terms.push(self.to_term(descriptor, property, element)?);
        }

        if property.is_collection() {
            container::write_collection(self.conn, node, property, &terms, self.graphs)?;
        } else if let Some(term) = terms.first() {
            self.conn
                .add_statement(node, &property.predicate, term, self.graphs)?;
        }
        Ok(())
    }

    fn to_term(
        &mut self,
        descriptor: &TypeDescriptor,
        property: &PropertyDescriptor,
        value: &Value,
    ) -> BindingResult<RdfObject> {
        match value {
            Value::Object(_) | Value::Proxy(_) | Value::Iri(_) | Value::Resource(_) => {
                Ok(self.to_resource(descriptor, property, value)?.into())
            }
            Value::List(_) => Err(BindingError::mapping(
                &descriptor.name,
                &property.name,
                "nested collections are not supported",
            )),
            scalar => self
                .engine
                .codec
                .to_literal(scalar)
                .map(RdfObject::from)
                .ok_or_else(|| {
                    BindingError::mapping(
                        &descriptor.name,
                        &property.name,
                        format!("{:?} has no literal form", scalar),
                    )
                }),
        }
    }

    fn to_resource(
        &mut self,
        descriptor: &TypeDescriptor,
        property: &PropertyDescriptor,
        value: &Value,
    ) -> BindingResult<RdfSubject> {
        match value {
            Value::Object(object) => self.marshal(object),
            Value::Proxy(proxy) => {
                proxy.ensure_live()?;
                Ok(proxy.node().clone())
            }
            Value::Iri(iri) => Ok(iri.clone().into()),
            Value::Resource(node) => Ok(node.clone()),
            other => Err(BindingError::mapping(
                &descriptor.name,
                &property.name,
                format!("{:?} is not a resource", other),
            )),
        }
    }
}
