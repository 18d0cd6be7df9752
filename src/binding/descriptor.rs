//! Type descriptors
//!
//! A [`TypeDescriptor`] is everything the engine knows about a bindable type:
//! its RDF class, the property holding its identifier, how identifiers become
//! IRIs, and an ordered list of [`PropertyDescriptor`]s. Descriptors are built
//! once, validated, and shared by `Arc` through a [`DescriptorRegistry`].

use super::error::{BindingError, BindingResult};
use super::value::Value;
use crate::rdf::{vocab, NamedNode, NamespaceManager, RdfSubject};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a multi-valued property is laid out in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// One statement per value
    #[default]
    None,
    /// rdf:Bag container node
    Bag,
    /// rdf:Seq container node
    Seq,
    /// rdf:Alt container node
    Alt,
    /// rdf:first/rdf:rest chain
    List,
}

impl ContainerKind {
    /// The container class IRI (bag/seq/alt only)
    pub fn rdf_type(&self) -> Option<NamedNode> {
        match self {
            ContainerKind::Bag => Some(NamedNode::new_unchecked(vocab::RDF_BAG)),
            ContainerKind::Seq => Some(NamedNode::new_unchecked(vocab::RDF_SEQ)),
            ContainerKind::Alt => Some(NamedNode::new_unchecked(vocab::RDF_ALT)),
            ContainerKind::None | ContainerKind::List => None,
        }
    }

    /// Whether decoding preserves order
    pub fn is_ordered(&self) -> bool {
        matches!(self, ContainerKind::Seq | ContainerKind::Alt | ContainerKind::List)
    }
}

/// Scalar or collection-valued property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Scalar,
    Collection,
}

/// Component type of a property's values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Integer,
    Double,
    String,
    /// Raw literal, datatype preserved
    Literal,
    /// IRI-valued property
    Iri,
    /// Opaque node identifier, never unmarshalled
    Resource,
    /// Another bound type, by descriptor name
    Object(String),
    /// Whatever the stored term decodes to
    Any,
}

impl ValueKind {
    /// Primitive kinds read back as a zero value rather than null
    pub fn is_primitive(&self) -> bool {
        matches!(self, ValueKind::Bool | ValueKind::Integer | ValueKind::Double)
    }

    pub fn zero_value(&self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Double => Value::Double(0.0),
            _ => Value::Null,
        }
    }
}

/// Mapping of one property onto a predicate
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub predicate: NamedNode,
    /// Stored as `(related, predicate, this)` instead of `(this, predicate, related)`
    pub inverse: bool,
    pub container: ContainerKind,
    pub cardinality: Cardinality,
    pub component: ValueKind,
}

impl PropertyDescriptor {
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Collection
    }

    /// Value reported when no statement exists
    pub fn empty_value(&self) -> Value {
        if self.is_collection() {
            Value::List(Vec::new())
        } else {
            self.component.zero_value()
        }
    }
}

/// Unresolved property declaration; predicates may use compact IRIs
#[derive(Debug, Clone)]
pub struct PropertySpec {
    name: String,
    predicate: String,
    inverse: bool,
    container: ContainerKind,
    cardinality: Cardinality,
    component: ValueKind,
}

impl PropertySpec {
    pub fn scalar(
        name: impl Into<String>,
        predicate: impl Into<String>,
        component: ValueKind,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: predicate.into(),
            inverse: false,
            container: ContainerKind::None,
            cardinality: Cardinality::Scalar,
            component,
        }
    }

    pub fn collection(
        name: impl Into<String>,
        predicate: impl Into<String>,
        component: ValueKind,
    ) -> Self {
        Self {
            cardinality: Cardinality::Collection,
            ..Self::scalar(name, predicate, component)
        }
    }

    pub fn container(mut self, container: ContainerKind) -> Self {
        self.container = container;
        self
    }

    pub fn inverse(mut self) -> Self {
        self.inverse = true;
        self
    }
}

/// Per-type mapping metadata
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Binding-class name written to the store
    pub name: String,
    pub rdf_type: NamedNode,
    /// Property carrying the subject identifier
    pub subject_property: Option<String>,
    /// String or Integer; identifiers read back as this kind
    pub subject_kind: ValueKind,
    /// Prefix joined with identifiers to form node IRIs
    pub namespace: Option<String>,
    /// Declared supertype chain, nearest first
    pub supertypes: Vec<NamedNode>,
    pub properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptor {
    pub fn builder(name: impl Into<String>, rdf_type: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            name: name.into(),
            rdf_type: rdf_type.into(),
            subject_property: None,
            subject_kind: ValueKind::String,
            namespace: None,
            supertypes: Vec::new(),
            properties: Vec::new(),
            namespaces: NamespaceManager::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn is_subject_property(&self, name: &str) -> bool {
        self.subject_property.as_deref() == Some(name)
    }

    /// Look up a declared property or fail with `UnknownProperty`
    pub fn require(&self, name: &str) -> BindingResult<&PropertyDescriptor> {
        self.property(name).ok_or_else(|| BindingError::UnknownProperty {
            type_name: self.name.clone(),
            property: name.to_string(),
        })
    }

    /// Check the descriptor is usable for mapping
    pub fn validate(&self) -> BindingResult<()> {
        if self.name.trim().is_empty() {
            return Err(BindingError::validation("<unnamed>", "type name is empty"));
        }

        let mut seen = FxHashSet::default();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(BindingError::validation(
                    &self.name,
                    format!("property {} declared twice", property.name),
                ));
            }
            if self.is_subject_property(&property.name) {
                return Err(BindingError::validation(
                    &self.name,
                    format!("subject property {} is also mapped to a predicate", property.name),
                ));
            }
        }

        if !matches!(self.subject_kind, ValueKind::String | ValueKind::Integer) {
            return Err(BindingError::validation(
                &self.name,
                format!("identifiers must be String or Integer, not {:?}", self.subject_kind),
            ));
        }

        if let Some(namespace) = &self.namespace {
            if NamedNode::new(namespace).is_err() {
                return Err(BindingError::validation(
                    &self.name,
                    format!("namespace {} is not an IRI", namespace),
                ));
            }
        }
        Ok(())
    }

    /// Node derived from an identifier value; `Ok(None)` for a null identifier
    ///
    /// Identifiers must match the declared kind. A string naming an integer
    /// is accepted for integer identifiers.
    pub fn node_for_id(&self, id: &Value) -> BindingResult<Option<RdfSubject>> {
        let subject_property = self.subject_property.as_deref().unwrap_or("<subject>");
        let mismatch = |id: &Value| {
            BindingError::mapping(
                &self.name,
                subject_property,
                format!("{:?} cannot identify a node of {:?} identifiers", id, self.subject_kind),
            )
        };
        match (id, &self.subject_kind) {
            (Value::Null, _) => Ok(None),
            (Value::Iri(iri), _) => Ok(Some(iri.clone().into())),
            (Value::Resource(node), _) => Ok(Some(node.clone())),
            (Value::String(s), ValueKind::String) => {
                self.iri_for_id(s).map(|iri| Some(iri.into()))
            }
            (Value::String(s), ValueKind::Integer) if s.parse::<i64>().is_ok() => {
                self.iri_for_id(s).map(|iri| Some(iri.into()))
            }
            (Value::Integer(i), ValueKind::Integer) => {
                self.iri_for_id(&i.to_string()).map(|iri| Some(iri.into()))
            }
            (other, _) => Err(mismatch(other)),
        }
    }

    fn iri_for_id(&self, id: &str) -> BindingResult<NamedNode> {
        // Absolute IRIs are used as-is
        if let Ok(iri) = NamedNode::new(id) {
            return Ok(iri);
        }
        let iri = match &self.namespace {
            Some(namespace) => format!("{}{}", namespace, id),
            None => id.to_string(),
        };
        NamedNode::new(&iri).map_err(|e| {
            BindingError::mapping(
                &self.name,
                self.subject_property.as_deref().unwrap_or("<subject>"),
                e.to_string(),
            )
        })
    }

    /// Identifier recovered from a node (None for blank nodes)
    pub fn id_for_node(&self, node: &RdfSubject) -> Option<String> {
        let iri = node.as_named_node()?.as_str();
        let id = match &self.namespace {
            Some(namespace) => iri.strip_prefix(namespace.as_str()).unwrap_or(iri),
            None => iri,
        };
        Some(id.to_string())
    }

    /// Identifier value of the declared kind (None for blank nodes)
    ///
    /// A node whose suffix is not an integer, under integer identifiers,
    /// comes back as its IRI.
    pub fn id_value_for_node(&self, node: &RdfSubject) -> Option<Value> {
        let id = self.id_for_node(node)?;
        match self.subject_kind {
            ValueKind::Integer => match id.parse::<i64>() {
                Ok(i) => Some(Value::Integer(i)),
                Err(_) => node.as_named_node().cloned().map(Value::Iri),
            },
            _ => Some(Value::String(id)),
        }
    }
}

/// Builder resolving compact IRIs against a namespace manager
pub struct TypeDescriptorBuilder {
    name: String,
    rdf_type: String,
    subject_property: Option<String>,
    subject_kind: ValueKind,
    namespace: Option<String>,
    supertypes: Vec<String>,
    properties: Vec<PropertySpec>,
    namespaces: NamespaceManager,
}

impl TypeDescriptorBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.namespaces.add_prefix(prefix, iri);
        self
    }

    pub fn subject(mut self, property: impl Into<String>) -> Self {
        self.subject_property = Some(property.into());
        self
    }

    /// Identifier kind, String unless set
    pub fn subject_kind(mut self, kind: ValueKind) -> Self {
        self.subject_kind = kind;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn supertype(mut self, rdf_type: impl Into<String>) -> Self {
        self.supertypes.push(rdf_type.into());
        self
    }

    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    pub fn build(self) -> BindingResult<TypeDescriptor> {
        let name = self.name;
        let resolve = |iri: &str| {
            self.namespaces
                .resolve(iri)
                .map_err(|e| BindingError::validation(&name, e.to_string()))
        };

        let rdf_type = resolve(&self.rdf_type)?;
        let supertypes = self
            .supertypes
            .iter()
            .map(|s| resolve(s))
            .collect::<BindingResult<Vec<_>>>()?;
        let properties = self
            .properties
            .iter()
            .map(|spec| {
                Ok(PropertyDescriptor {
                    name: spec.name.clone(),
                    predicate: resolve(&spec.predicate)?,
                    inverse: spec.inverse,
                    container: spec.container,
                    cardinality: spec.cardinality,
                    component: spec.component.clone(),
                })
            })
            .collect::<BindingResult<Vec<_>>>()?;

        let descriptor = TypeDescriptor {
            name: name.clone(),
            rdf_type,
            subject_property: self.subject_property,
            subject_kind: self.subject_kind,
            namespace: self.namespace,
            supertypes,
            properties,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Process-wide table of descriptors, keyed by binding-class name
#[derive(Default)]
pub struct DescriptorRegistry {
    by_name: RwLock<FxHashMap<String, Arc<TypeDescriptor>>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a descriptor, replacing any with the same name
    pub fn register(&self, descriptor: TypeDescriptor) -> BindingResult<Arc<TypeDescriptor>> {
        descriptor.validate()?;
        let descriptor = Arc::new(descriptor);
        self.by_name
            .write()
            .insert(descriptor.name.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.by_name.read().get(name).cloned()
    }

    /// Look up a descriptor a caller asked for by name
    pub fn resolve(&self, name: &str) -> BindingResult<Arc<TypeDescriptor>> {
        self.get(name)
            .ok_or_else(|| BindingError::validation(name, "no descriptor registered"))
    }

    /// Descriptors mapped to an RDF class
    pub fn by_rdf_type(&self, rdf_type: &NamedNode) -> Vec<Arc<TypeDescriptor>> {
        self.by_name
            .read()
            .values()
            .filter(|d| &d.rdf_type == rdf_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EX: &str = "http://example.org/";

    fn person() -> TypeDescriptor {
        TypeDescriptor::builder("Person", "ex:Person")
            .prefix("ex", EX)
            .subject("id")
            .namespace("http://example.org/people/")
            .supertype("foaf:Agent")
            .property(PropertySpec::scalar("name", "foaf:name", ValueKind::String))
            .property(
                PropertySpec::collection("nick", "ex:nick", ValueKind::String)
                    .container(ContainerKind::Alt),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_resolves_compact_iris() {
        let d = person();
        assert_eq!(d.rdf_type.as_str(), "http://example.org/Person");
        assert_eq!(d.supertypes[0].as_str(), "http://xmlns.com/foaf/0.1/Agent");
        assert_eq!(
            d.property("name").unwrap().predicate.as_str(),
            "http://xmlns.com/foaf/0.1/name"
        );
        assert!(d.property("nick").unwrap().is_collection());
        assert!(matches!(d.require("age"), Err(BindingError::UnknownProperty { .. })));
    }

    #[test]
    fn test_validation_rejects_duplicates_and_subject_clash() {
        let dup = TypeDescriptor::builder("Dup", "http://example.org/Dup")
            .property(PropertySpec::scalar("a", "http://example.org/a", ValueKind::Any))
            .property(PropertySpec::scalar("a", "http://example.org/b", ValueKind::Any))
            .build();
        assert!(matches!(dup, Err(BindingError::Validation { .. })));

        let clash = TypeDescriptor::builder("Clash", "http://example.org/Clash")
            .subject("id")
            .property(PropertySpec::scalar("id", "http://example.org/id", ValueKind::String))
            .build();
        assert!(matches!(clash, Err(BindingError::Validation { .. })));

        let bad_iri = TypeDescriptor::builder("Bad", "not an iri").build();
        assert!(matches!(bad_iri, Err(BindingError::Validation { .. })));
    }

    #[test]
    fn test_node_identifier_mapping() {
        let d = person();
        let node = d.node_for_id(&Value::from("john")).unwrap().unwrap();
        assert_eq!(node.to_string(), "<http://example.org/people/john>");
        assert_eq!(d.id_for_node(&node), Some("john".to_string()));
        assert_eq!(d.node_for_id(&Value::Null).unwrap(), None);
        assert!(d.node_for_id(&Value::Bool(true)).is_err());

        let absolute = d.node_for_id(&Value::from("http://other.org/jane")).unwrap().unwrap();
        assert_eq!(absolute.to_string(), "<http://other.org/jane>");

        // String identifiers do not accept integers
        assert!(matches!(
            d.node_for_id(&Value::Integer(7)),
            Err(BindingError::Mapping { .. })
        ));
        assert_eq!(d.id_value_for_node(&node), Some(Value::from("john")));
    }

    #[test]
    fn test_integer_identifiers() {
        let d = TypeDescriptor::builder("Order", "http://example.org/Order")
            .subject("number")
            .subject_kind(ValueKind::Integer)
            .namespace("http://example.org/orders/")
            .build()
            .unwrap();

        let node = d.node_for_id(&Value::Integer(42)).unwrap().unwrap();
        assert_eq!(node.to_string(), "<http://example.org/orders/42>");
        assert_eq!(d.id_value_for_node(&node), Some(Value::Integer(42)));
        assert_eq!(d.node_for_id(&Value::from("42")).unwrap(), Some(node));
        assert!(matches!(
            d.node_for_id(&Value::from("forty-two")),
            Err(BindingError::Mapping { .. })
        ));

        let foreign: RdfSubject = NamedNode::new("http://other.org/x").unwrap().into();
        assert_eq!(
            d.id_value_for_node(&foreign),
            Some(Value::Iri(NamedNode::new("http://other.org/x").unwrap()))
        );

        let bad = TypeDescriptor::builder("Bad", "http://example.org/Bad")
            .subject("id")
            .subject_kind(ValueKind::Double)
            .build();
        assert!(matches!(bad, Err(BindingError::Validation { .. })));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = DescriptorRegistry::new();
        let d = registry.register(person()).unwrap();
        assert!(Arc::ptr_eq(&registry.resolve("Person").unwrap(), &d));
        assert_eq!(registry.by_rdf_type(&d.rdf_type).len(), 1);
        assert!(registry.resolve("Company").is_err());
    }

    #[test]
    fn test_empty_values() {
        let d = person();
        assert_eq!(d.property("nick").unwrap().empty_value(), Value::List(vec![]));
        assert_eq!(d.property("name").unwrap().empty_value(), Value::Null);
        assert_eq!(ValueKind::Integer.zero_value(), Value::Integer(0));
    }
}
