//! RDF namespace and prefix management
//!
//! This module handles namespace prefixes for compact IRI notation and the
//! vocabulary terms the binding engine writes (rdf:type, containers, lists,
//! rdfs:subClassOf and the binding-class metadata predicate).

use super::types::NamedNode;
use std::collections::HashMap;
use thiserror::Error;

/// Prefix errors
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Vocabulary IRIs used by the mapping engine
pub mod vocab {
    use super::NamedNode;

    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

    /// Default namespace of the binding metadata vocabulary
    pub const BIND: &str = "http://samyama.ai/bind/2.0/";

    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const RDF_BAG: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag";
    pub const RDF_SEQ: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Seq";
    pub const RDF_ALT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Alt";
    pub const RDFS_SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";

    pub fn rdf_type() -> NamedNode {
        NamedNode::new_unchecked(RDF_TYPE)
    }

    pub fn rdf_first() -> NamedNode {
        NamedNode::new_unchecked(RDF_FIRST)
    }

    pub fn rdf_rest() -> NamedNode {
        NamedNode::new_unchecked(RDF_REST)
    }

    pub fn rdf_nil() -> NamedNode {
        NamedNode::new_unchecked(RDF_NIL)
    }

    pub fn rdfs_sub_class_of() -> NamedNode {
        NamedNode::new_unchecked(RDFS_SUB_CLASS_OF)
    }

    /// Container membership predicate `rdf:_n` (1-based)
    pub fn rdf_member(index: usize) -> NamedNode {
        NamedNode::new_unchecked(format!("{}_{}", RDF, index))
    }

    /// Index of a container membership predicate, if `predicate` is one
    pub fn member_index(predicate: &NamedNode) -> Option<usize> {
        predicate
            .as_str()
            .strip_prefix(RDF)
            .and_then(|local| local.strip_prefix('_'))
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
    }

    pub fn xsd(local: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("{}{}", XSD, local))
    }
}

/// Namespace manager with common prefixes
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    /// Prefix → IRI mappings
    prefixes: HashMap<String, String>,
}

impl NamespaceManager {
    /// Create a new namespace manager with common prefixes
    pub fn new() -> Self {
        let mut mgr = Self {
            prefixes: HashMap::new(),
        };

        mgr.add_prefix("rdf", vocab::RDF);
        mgr.add_prefix("rdfs", vocab::RDFS);
        mgr.add_prefix("xsd", vocab::XSD);
        mgr.add_prefix("owl", "http://www.w3.org/2002/07/owl#");
        mgr.add_prefix("foaf", "http://xmlns.com/foaf/0.1/");
        mgr.add_prefix("dc", "http://purl.org/dc/elements/1.1/");
        mgr.add_prefix("dcterms", "http://purl.org/dc/terms/");
        mgr.add_prefix("bind", vocab::BIND);

        mgr
    }

    /// Add a prefix
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> PrefixResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        if let Some(pos) = compact_iri.find(':') {
            let prefix = &compact_iri[..pos];
            let local = &compact_iri[pos + 1..];
            let iri = self.get_iri(prefix)?;
            Ok(format!("{}{}", iri, local))
        } else {
            Err(PrefixError::InvalidIri(compact_iri.to_string()))
        }
    }

    /// Resolve either a compact IRI with a known prefix or an absolute IRI
    pub fn resolve(&self, iri: &str) -> PrefixResult<NamedNode> {
        let expanded = match iri.find(':') {
            Some(pos) if self.prefixes.contains_key(&iri[..pos]) => self.expand(iri)?,
            _ => iri.to_string(),
        };
        NamedNode::new(&expanded).map_err(|e| PrefixError::InvalidIri(e.to_string()))
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefixes() {
        let mgr = NamespaceManager::new();

        assert_eq!(
            mgr.get_iri("rdf").unwrap(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        );
        assert_eq!(mgr.get_iri("xsd").unwrap(), "http://www.w3.org/2001/XMLSchema#");
        assert!(mgr.get_iri("nope").is_err());
    }

    #[test]
    fn test_expand_and_resolve() {
        let mut mgr = NamespaceManager::new();
        mgr.add_prefix("ex", "http://example.org/");

        assert_eq!(mgr.expand("foaf:name").unwrap(), "http://xmlns.com/foaf/0.1/name");
        assert_eq!(
            mgr.resolve("ex:knows").unwrap().as_str(),
            "http://example.org/knows"
        );
        // Absolute IRIs pass through untouched
        assert_eq!(
            mgr.resolve("http://other.org/p").unwrap().as_str(),
            "http://other.org/p"
        );
    }

    #[test]
    fn test_member_index() {
        assert_eq!(vocab::member_index(&vocab::rdf_member(3)), Some(3));
        assert_eq!(vocab::member_index(&vocab::rdf_first()), None);
        assert_eq!(vocab::member_index(&vocab::rdf_member(0)), None);
    }
}
