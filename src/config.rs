//! Engine configuration
//!
//! Loaded from YAML or JSON, or built in code from [`BindingConfig::default`].

use crate::rdf::{vocab, GraphName, NamedNode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured IRI does not parse
    #[error("Invalid IRI in config: {0}")]
    InvalidIri(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Binding engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Graphs used when a call names none. Empty means writes go to the
    /// default graph and reads see every graph.
    pub default_graphs: Vec<String>,
    /// Namespace of the engine's own vocabulary (`bindingClass`)
    pub binding_namespace: String,
    /// Write `rdfs:subClassOf` for declared supertypes alongside binding-class metadata
    pub write_supertypes: bool,
    /// Fall back to a CONSTRUCT query through containers for inverse reads
    pub inverse_fallback_query: bool,
    /// Drop idle node locks when the registry closes
    pub prune_locks_on_close: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            default_graphs: Vec::new(),
            binding_namespace: vocab::BIND.to_string(),
            write_supertypes: true,
            inverse_fallback_query: true,
            prune_locks_on_close: true,
        }
    }
}

impl BindingConfig {
    pub fn from_yaml_str(input: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn from_json_str(input: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load from a file; `.json` is read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&input),
            _ => Self::from_yaml_str(&input),
        }
    }

    /// Parsed default graph partitions
    pub fn graphs(&self) -> ConfigResult<Vec<GraphName>> {
        self.default_graphs
            .iter()
            .map(|g| {
                NamedNode::new(g)
                    .map(Some)
                    .map_err(|e| ConfigError::InvalidIri(e.to_string()))
            })
            .collect()
    }

    /// Predicate linking an RDF class to its binding-class name
    pub fn binding_class_predicate(&self) -> ConfigResult<NamedNode> {
        NamedNode::new(&format!("{}bindingClass", self.binding_namespace))
            .map_err(|e| ConfigError::InvalidIri(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BindingConfig::default();
        assert!(config.graphs().unwrap().is_empty());
        assert_eq!(
            config.binding_class_predicate().unwrap().as_str(),
            "http://samyama.ai/bind/2.0/bindingClass"
        );
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = BindingConfig::from_yaml_str(
            "default_graphs:\n  - http://example.org/g1\ninverse_fallback_query: false\n",
        )
        .unwrap();
        assert_eq!(
            config.graphs().unwrap(),
            vec![Some(NamedNode::new("http://example.org/g1").unwrap())]
        );
        assert!(!config.inverse_fallback_query);
        assert!(config.write_supertypes);
    }

    #[test]
    fn test_json_and_bad_iri() {
        let config =
            BindingConfig::from_json_str(r#"{"default_graphs": ["not an iri"]}"#).unwrap();
        assert!(matches!(config.graphs(), Err(ConfigError::InvalidIri(_))));
        assert!(BindingConfig::from_json_str("{").is_err());
    }
}
