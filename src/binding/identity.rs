//! Call-scoped identity caches
//!
//! Both caches live for one top-level marshal or unmarshal call. They map an
//! object to exactly one node (and back), so shared references stay shared
//! and cyclic graphs terminate.

use super::value::Instance;
use crate::rdf::RdfSubject;
use rustc_hash::FxHashMap;

/// Instance → node, keyed by instance identity
#[derive(Default)]
pub struct MarshalCache {
    // The instance is held so its address cannot be reused mid-call
    nodes: FxHashMap<usize, (Instance, RdfSubject)>,
}

impl MarshalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: &Instance) -> Option<&RdfSubject> {
        self.nodes.get(&object.key()).map(|(_, node)| node)
    }

    pub fn insert(&mut self, object: &Instance, node: RdfSubject) {
        self.nodes.insert(object.key(), (object.clone(), node));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Node → instance
#[derive(Default)]
pub struct UnmarshalCache {
    objects: FxHashMap<RdfSubject, Instance>,
}

impl UnmarshalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &RdfSubject) -> Option<&Instance> {
        self.objects.get(node)
    }

    pub fn insert(&mut self, node: RdfSubject, object: Instance) {
        self.objects.insert(node, object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::descriptor::TypeDescriptor;
    use crate::rdf::{BlankNode, NamedNode};
    use std::sync::Arc;

    fn thing() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::builder("Thing", "http://example.org/Thing").build().unwrap())
    }

    #[test]
    fn test_marshal_cache_is_identity_keyed() {
        let mut cache = MarshalCache::new();
        let a = Instance::new(thing());
        let b = Instance::new(thing());
        let node: RdfSubject = BlankNode::new().into();

        cache.insert(&a, node.clone());
        assert_eq!(cache.get(&a), Some(&node));
        assert_eq!(cache.get(&a.clone()), Some(&node));
        assert!(cache.get(&b).is_none());
    }

    #[test]
    fn test_unmarshal_cache() {
        let mut cache = UnmarshalCache::new();
        let node: RdfSubject = NamedNode::new("http://example.org/a").unwrap().into();
        let a = Instance::new(thing());
        cache.insert(node.clone(), a.clone());
        assert!(cache.get(&node).unwrap().ptr_eq(&a));
        assert_eq!(cache.len(), 1);
    }
}
