//! Property values and bound instances
//!
//! [`Instance`] is a detached object: a shared, lockable bag of property
//! values typed by a [`TypeDescriptor`]. Instances compare and hash by
//! identity, which is what the marshal-side identity cache keys on.

use super::descriptor::TypeDescriptor;
use super::error::{BindingError, BindingResult};
use super::proxy::LiveProxy;
use crate::rdf::{Literal, NamedNode, RdfSubject};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A property value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// Literal with a datatype or language the codec does not map
    Literal(Literal),
    Iri(NamedNode),
    /// Node left unresolved
    Resource(RdfSubject),
    Object(Instance),
    Proxy(LiveProxy),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Literal(l) => Some(l.value()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&LiveProxy> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Node a resource-shaped value refers to, without writing anything
    pub fn as_node(&self) -> Option<RdfSubject> {
        match self {
            Value::Iri(iri) => Some(iri.clone().into()),
            Value::Resource(node) => Some(node.clone()),
            Value::Proxy(proxy) => Some(proxy.node().clone()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Literal> for Value {
    fn from(v: Literal) -> Self {
        Value::Literal(v)
    }
}

impl From<NamedNode> for Value {
    fn from(v: NamedNode) -> Self {
        Value::Iri(v)
    }
}

impl From<RdfSubject> for Value {
    fn from(v: RdfSubject) -> Self {
        Value::Resource(v)
    }
}

impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Value::Object(v)
    }
}

impl From<&Instance> for Value {
    fn from(v: &Instance) -> Self {
        Value::Object(v.clone())
    }
}

impl From<LiveProxy> for Value {
    fn from(v: LiveProxy) -> Self {
        Value::Proxy(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

struct Entity {
    descriptor: Arc<TypeDescriptor>,
    values: IndexMap<String, Value>,
}

/// A detached bound object
///
/// Clones share state. Equality is identity.
#[derive(Clone)]
pub struct Instance(Arc<RwLock<Entity>>);

impl Instance {
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        Instance(Arc::new(RwLock::new(Entity {
            descriptor,
            values: IndexMap::new(),
        })))
    }

    /// New instance with its identifier already set
    pub fn with_id(descriptor: Arc<TypeDescriptor>, id: impl Into<Value>) -> BindingResult<Self> {
        let instance = Self::new(descriptor);
        let subject = instance.descriptor().subject_property.clone().ok_or_else(|| {
            BindingError::validation(instance.type_name(), "type declares no subject property")
        })?;
        instance.set(&subject, id)?;
        Ok(instance)
    }

    pub fn descriptor(&self) -> Arc<TypeDescriptor> {
        Arc::clone(&self.0.read().descriptor)
    }

    pub fn type_name(&self) -> String {
        self.0.read().descriptor.name.clone()
    }

    /// Read a property; unset properties read as their empty value
    pub fn get(&self, property: &str) -> BindingResult<Value> {
        let entity = self.0.read();
        if let Some(value) = entity.values.get(property) {
            return Ok(value.clone());
        }
        if entity.descriptor.is_subject_property(property) {
            return Ok(Value::Null);
        }
        Ok(entity.descriptor.require(property)?.empty_value())
    }

    pub fn set(&self, property: &str, value: impl Into<Value>) -> BindingResult<()> {
        let mut entity = self.0.write();
        if !entity.descriptor.is_subject_property(property) {
            entity.descriptor.require(property)?;
        }
        entity.values.insert(property.to_string(), value.into());
        Ok(())
    }

    /// The stored value, Null when never set
    pub(crate) fn raw(&self, property: &str) -> Value {
        self.0.read().values.get(property).cloned().unwrap_or(Value::Null)
    }

    /// The subject identifier value
    pub fn id(&self) -> Value {
        let entity = self.0.read();
        entity
            .descriptor
            .subject_property
            .as_ref()
            .and_then(|p| entity.values.get(p).cloned())
            .unwrap_or(Value::Null)
    }

    /// Snapshot of the values set so far, in assignment order
    pub fn values(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity key for call-scoped caches
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Values may form cycles, so Debug prints identity only
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(entity) => {
                let id = entity
                    .descriptor
                    .subject_property
                    .as_ref()
                    .and_then(|p| entity.values.get(p));
                write!(f, "{}({:?})", entity.descriptor.name, id.unwrap_or(&Value::Null))
            }
            None => write!(f, "Instance(<locked>)"),
        }
    }
}

/// Uniform property access over detached instances and live proxies
pub trait Bound {
    fn descriptor(&self) -> Arc<TypeDescriptor>;

    fn get(&self, property: &str) -> BindingResult<Value>;

    fn set(&self, property: &str, value: Value) -> BindingResult<()>;

    /// Element of a collection property; Null when out of range
    fn get_at(&self, property: &str, index: usize) -> BindingResult<Value> {
        let value = self.get(property)?;
        match value {
            Value::List(items) => Ok(items.into_iter().nth(index).unwrap_or(Value::Null)),
            other if index == 0 => Ok(other),
            _ => Ok(Value::Null),
        }
    }

    /// Replace one element of a collection property, or append at `len`
    ///
    /// Collections never hold gaps, so an index past the end or a null
    /// element is a mapping error.
    fn set_at(&self, property: &str, index: usize, value: Value) -> BindingResult<()> {
        let mut items = match self.get(property)? {
            Value::List(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        let type_name = self.descriptor().name.clone();
        if value.is_null() {
            return Err(BindingError::mapping(type_name, property, "null collection element"));
        }
        match index.cmp(&items.len()) {
            Ordering::Less => items[index] = value,
            Ordering::Equal => items.push(value),
            Ordering::Greater => {
                return Err(BindingError::mapping(
                    type_name,
                    property,
                    format!("index {} is past the end ({} elements)", index, items.len()),
                ))
            }
        }
        self.set(property, Value::List(items))
    }
}

impl Bound for Instance {
    fn descriptor(&self) -> Arc<TypeDescriptor> {
        Instance::descriptor(self)
    }

    fn get(&self, property: &str) -> BindingResult<Value> {
        Instance::get(self, property)
    }

    fn set(&self, property: &str, value: Value) -> BindingResult<()> {
        Instance::set(self, property, value)
    }
}
