//! Statements → object graph

use super::container;
use super::descriptor::{PropertyDescriptor, TypeDescriptor, ValueKind};
use super::engine::Engine;
use super::error::{BindingError, BindingResult};
use super::identity::UnmarshalCache;
use super::value::{Instance, Value};
use crate::rdf::{vocab, GraphName, RdfObject, RdfSubject, StatementPattern};
use crate::store::Connection;
use std::sync::Arc;
use tracing::{debug, trace};

/// Reads one object graph out of the store
///
/// The node's read lock is held only while its statements are gathered.
/// Decoding, including recursion into referenced nodes, happens after the
/// lock is released, so a reader never holds two node locks at once.
pub struct GraphReader<'a> {
    engine: &'a Arc<Engine>,
    conn: &'a dyn Connection,
    graphs: &'a [GraphName],
    /// Bound references come back as live proxies instead of instances
    live: bool,
    cache: UnmarshalCache,
}

impl<'a> GraphReader<'a> {
    pub(crate) fn new(
        engine: &'a Arc<Engine>,
        conn: &'a dyn Connection,
        graphs: &'a [GraphName],
    ) -> Self {
        Self {
            engine,
            conn,
            graphs,
            live: false,
            cache: UnmarshalCache::new(),
        }
    }

    pub(crate) fn live(
        engine: &'a Arc<Engine>,
        conn: &'a dyn Connection,
        graphs: &'a [GraphName],
    ) -> Self {
        Self {
            live: true,
            ..Self::new(engine, conn, graphs)
        }
    }

    /// Rebuild the object stored at `node`; None if the node has no statements
    ///
    /// Without a descriptor the type is resolved from binding-class metadata.
    pub fn unmarshal(
        &mut self,
        node: &RdfSubject,
        descriptor: Option<Arc<TypeDescriptor>>,
    ) -> BindingResult<Option<Instance>> {
        if let Some(object) = self.cache.get(node) {
            return Ok(Some(object.clone()));
        }

        let (descriptor, gathered) = {
            let _guard = self.engine.locks.read(node);
            if !self.exists(node)? {
                return Ok(None);
            }

            let descriptor = match descriptor {
                Some(descriptor) => descriptor,
                None => self.resolve_descriptor(node)?,
            };
            let mut gathered = Vec::with_capacity(descriptor.properties.len());
            for property in &descriptor.properties {
                gathered.push(self.property_terms(node, property)?);
            }
            (descriptor, gathered)
        };

        let object = Instance::new(Arc::clone(&descriptor));
        self.cache.insert(node.clone(), object.clone());

        if let Some(subject) = &descriptor.subject_property {
            if let Some(id) = descriptor.id_value_for_node(node) {
                object.set(subject, id)?;
            }
        }
        for (property, terms) in descriptor.properties.iter().zip(gathered) {
            let value = self.decode_terms(property, terms)?;
            if !value.is_null() {
                object.set(&property.name, value)?;
            }
        }

        debug!("Unmarshalled {} from {}", descriptor.name, node);
        Ok(Some(object))
    }

    /// The type to instantiate for `node`, from binding-class metadata
    pub fn resolve_descriptor(&self, node: &RdfSubject) -> BindingResult<Arc<TypeDescriptor>> {
        self.discover(node)?.ok_or_else(|| BindingError::ClassResolution {
            node: node.to_string(),
            reason: "no rdf:type carries a known binding class".to_string(),
        })
    }

    /// Try each `rdf:type` in statement order; first registered binding class wins
    fn discover(&self, node: &RdfSubject) -> BindingResult<Option<Arc<TypeDescriptor>>> {
        let types: Vec<RdfSubject> = self
            .conn
            .get_statements(&StatementPattern::forward(node, &vocab::rdf_type()), self.graphs)?
            .filter_map(|s| s.object.as_subject())
            .collect();

        for rdf_type in types {
            let names = self.conn.get_statements(
                &StatementPattern::forward(&rdf_type, &self.engine.binding_class),
                self.graphs,
            )?;
            for statement in names {
                let Some(name) = statement.object.as_literal() else {
                    continue;
                };
                if let Some(descriptor) = self.engine.descriptors.get(name.value()) {
                    return Ok(Some(descriptor));
                }
                trace!("Binding class {} of {} is not registered", name.value(), rdf_type);
            }
        }
        Ok(None)
    }

    /// Terms stored for one property; the caller holds the node's read lock
    pub(crate) fn property_terms(
        &self,
        node: &RdfSubject,
        property: &PropertyDescriptor,
    ) -> BindingResult<Vec<RdfObject>> {
        let terms = if property.inverse {
            container::read_inverse(
                self.conn,
                node,
                property,
                self.graphs,
                self.engine.config.inverse_fallback_query,
            )?
        } else {
            container::read_forward(self.conn, node, property, self.graphs)?
        };
        Ok(terms)
    }

    /// Turn gathered terms into a property value
    pub(crate) fn decode_terms(
        &mut self,
        property: &PropertyDescriptor,
        terms: Vec<RdfObject>,
    ) -> BindingResult<Value> {
        if property.is_collection() {
            let mut items = Vec::with_capacity(terms.len());
            for term in terms {
                items.push(self.decode_term(property, term)?);
            }
            return Ok(Value::List(items));
        }
        match terms.into_iter().next() {
            Some(term) => self.decode_term(property, term),
            None => Ok(property.empty_value()),
        }
    }

    fn decode_term(
        &mut self,
        property: &PropertyDescriptor,
        term: RdfObject,
    ) -> BindingResult<Value> {
        let node = match term {
            RdfObject::Literal(literal) => return Ok(self.engine.codec.from_literal(&literal)),
            RdfObject::NamedNode(iri) if property.component == ValueKind::Iri => {
                return Ok(Value::Iri(iri))
            }
            RdfObject::NamedNode(iri) => RdfSubject::from(iri),
            RdfObject::BlankNode(blank) => RdfSubject::from(blank),
        };

        let hint = match &property.component {
            ValueKind::Object(name) => Some(name.as_str()),
            ValueKind::Any => None,
            _ => return Ok(Value::Resource(node)),
        };

        if let Some(object) = self.cache.get(&node) {
            return Ok(Value::Object(object.clone()));
        }

        let target = match self.discover(&node)? {
            Some(found) => Some(found),
            None => match hint.and_then(|name| self.engine.descriptors.get(name)) {
                Some(hinted) => {
                    if self.exists(&node)? {
                        Some(hinted)
                    } else {
                        None
                    }
                }
                None => None,
            },
        };
        let Some(target) = target else {
            return Ok(Value::Resource(node));
        };

        if self.live {
            return Ok(Value::Proxy(self.engine.proxies.get_or_create(
                self.engine,
                &node,
                target,
                self.graphs,
            )));
        }
        Ok(match self.unmarshal(&node, Some(target))? {
            Some(object) => Value::Object(object),
            None => Value::Resource(node),
        })
    }

    fn exists(&self, node: &RdfSubject) -> BindingResult<bool> {
        Ok(self
            .conn
            .has_statement(&StatementPattern::new(Some(node.clone()), None, None), self.graphs)?)
    }
}
