//! SPARQL parser using spargebra library

use super::{QueryError, QueryResult};
use spargebra::algebra::GraphPattern;
use spargebra::term::TriplePattern;
use spargebra::Query;

/// A parsed CONSTRUCT query: the template and the WHERE pattern
#[derive(Debug, Clone)]
pub struct ConstructQuery {
    pub template: Vec<TriplePattern>,
    pub pattern: GraphPattern,
}

/// Parse a SPARQL string, accepting only the CONSTRUCT form
pub fn parse_construct(query: &str) -> QueryResult<ConstructQuery> {
    let parsed = Query::parse(query, None).map_err(|e| QueryError::Syntax(e.to_string()))?;
    match parsed {
        Query::Construct {
            template, pattern, ..
        } => Ok(ConstructQuery { template, pattern }),
        Query::Select { .. } => Err(QueryError::Unsupported("SELECT".to_string())),
        Query::Ask { .. } => Err(QueryError::Unsupported("ASK".to_string())),
        Query::Describe { .. } => Err(QueryError::Unsupported("DESCRIBE".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_construct() {
        let query = parse_construct(
            "CONSTRUCT { ?s <http://example.org/p> <http://example.org/o> } \
             WHERE { ?s <http://example.org/p> <http://example.org/o> }",
        )
        .unwrap();
        assert_eq!(query.template.len(), 1);
    }

    #[test]
    fn test_rejects_select_and_garbage() {
        assert!(matches!(
            parse_construct("SELECT * WHERE { ?s ?p ?o }"),
            Err(QueryError::Unsupported(_))
        ));
        assert!(matches!(parse_construct("CONSTRUCT {"), Err(QueryError::Syntax(_))));
    }
}
