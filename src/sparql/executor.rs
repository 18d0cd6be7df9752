//! CONSTRUCT evaluation over the in-memory store
//!
//! Supports basic graph patterns, group joins, UNION and GRAPH with a constant
//! name. Anything else is reported as unsupported.

use super::parser::ConstructQuery;
use super::{QueryError, QueryResult};
use crate::rdf::{
    BlankNode, GraphName, Literal, NamedNode, RdfObject, RdfSubject, Statement, StatementPattern,
};
use crate::store::MemoryStore;
use rustc_hash::{FxHashMap, FxHashSet};
use spargebra::algebra::GraphPattern;
use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};

/// Variable name → bound term
type Solution = FxHashMap<String, RdfObject>;

/// Position of a triple pattern: either a constant or a variable to bind
enum Slot {
    Constant(RdfObject),
    Variable(String),
}

impl Slot {
    fn from_term(term: &TermPattern) -> QueryResult<Self> {
        match term {
            TermPattern::NamedNode(n) => Ok(Slot::Constant(NamedNode::from(n.clone()).into())),
            TermPattern::Literal(l) => Ok(Slot::Constant(Literal::from(l.clone()).into())),
            // Blank nodes in a query pattern behave like variables
            TermPattern::BlankNode(b) => Ok(Slot::Variable(format!("_:{}", b.as_str()))),
            TermPattern::Variable(v) => Ok(Slot::Variable(v.as_str().to_string())),
            #[allow(unreachable_patterns)]
            other => Err(QueryError::Unsupported(other.to_string())),
        }
    }

    fn from_predicate(term: &NamedNodePattern) -> Self {
        match term {
            NamedNodePattern::NamedNode(n) => Slot::Constant(NamedNode::from(n.clone()).into()),
            NamedNodePattern::Variable(v) => Slot::Variable(v.as_str().to_string()),
        }
    }

    /// The constant, or the binding a solution holds for the variable
    fn resolve(&self, solution: &Solution) -> Option<RdfObject> {
        match self {
            Slot::Constant(term) => Some(term.clone()),
            Slot::Variable(name) => solution.get(name).cloned(),
        }
    }

    /// Bind the variable to `value`; false if it conflicts with an earlier binding
    fn bind(&self, solution: &mut Solution, value: RdfObject) -> bool {
        match self {
            Slot::Constant(term) => *term == value,
            Slot::Variable(name) => match solution.get(name) {
                Some(existing) => *existing == value,
                None => {
                    solution.insert(name.clone(), value);
                    true
                }
            },
        }
    }
}

/// Evaluate a parsed CONSTRUCT query
pub fn evaluate(store: &MemoryStore, query: &ConstructQuery) -> QueryResult<Vec<Statement>> {
    let solutions = eval_pattern(store, &query.pattern, &[])?;

    let mut seen = FxHashSet::default();
    let mut constructed = Vec::new();
    for solution in &solutions {
        // Template blank nodes are fresh for every solution
        let mut fresh: FxHashMap<String, BlankNode> = FxHashMap::default();
        for triple in &query.template {
            if let Some(statement) = instantiate(triple, solution, &mut fresh)? {
                if seen.insert(statement.clone()) {
                    constructed.push(statement);
                }
            }
        }
    }
    Ok(constructed)
}

fn instantiate(
    triple: &TriplePattern,
    solution: &Solution,
    fresh: &mut FxHashMap<String, BlankNode>,
) -> QueryResult<Option<Statement>> {
    let mut term = |pattern: &TermPattern| -> QueryResult<Option<RdfObject>> {
        if let TermPattern::BlankNode(b) = pattern {
            let node = fresh.entry(b.as_str().to_string()).or_default().clone();
            return Ok(Some(node.into()));
        }
        Ok(Slot::from_term(pattern)?.resolve(solution))
    };

    let subject = term(&triple.subject)?.and_then(|t| t.as_subject());
    let object = term(&triple.object)?;
    let predicate = match Slot::from_predicate(&triple.predicate).resolve(solution) {
        Some(RdfObject::NamedNode(n)) => Some(n),
        _ => None,
    };

    Ok(match (subject, predicate, object) {
        (Some(s), Some(p), Some(o)) => Some(Statement::new(s, p, o)),
        // Unbound or ill-typed positions drop the triple, as SPARQL requires
        _ => None,
    })
}

fn eval_pattern(
    store: &MemoryStore,
    pattern: &GraphPattern,
    graphs: &[GraphName],
) -> QueryResult<Vec<Solution>> {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            let mut solutions = vec![Solution::default()];
            for triple in patterns {
                solutions = match_triple(store, triple, graphs, solutions)?;
                if solutions.is_empty() {
                    break;
                }
            }
            Ok(solutions)
        }
        GraphPattern::Join { left, right } => {
            let left = eval_pattern(store, left, graphs)?;
            let right = eval_pattern(store, right, graphs)?;
            Ok(join(&left, &right))
        }
        GraphPattern::Union { left, right } => {
            let mut solutions = eval_pattern(store, left, graphs)?;
            solutions.extend(eval_pattern(store, right, graphs)?);
            Ok(solutions)
        }
        GraphPattern::Graph { name, inner } => match name {
            NamedNodePattern::NamedNode(n) => {
                eval_pattern(store, inner, &[Some(NamedNode::from(n.clone()))])
            }
            NamedNodePattern::Variable(v) => {
                Err(QueryError::Unsupported(format!("GRAPH ?{}", v.as_str())))
            }
        },
        other => Err(QueryError::Unsupported(format!("{}", other))),
    }
}

fn match_triple(
    store: &MemoryStore,
    triple: &TriplePattern,
    graphs: &[GraphName],
    solutions: Vec<Solution>,
) -> QueryResult<Vec<Solution>> {
    let subject = Slot::from_term(&triple.subject)?;
    let predicate = Slot::from_predicate(&triple.predicate);
    let object = Slot::from_term(&triple.object)?;

    let mut extended = Vec::new();
    for solution in solutions {
        let s = match subject.resolve(&solution) {
            Some(term) => match term.as_subject() {
                Some(s) => Some(s),
                // A literal in subject position can never match
                None => continue,
            },
            None => None,
        };
        let p = match predicate.resolve(&solution) {
            Some(RdfObject::NamedNode(n)) => Some(n),
            Some(_) => continue,
            None => None,
        };
        let o = object.resolve(&solution);

        for statement in store.query(&StatementPattern::new(s, p, o), graphs) {
            let mut candidate = solution.clone();
            if subject.bind(&mut candidate, subject_term(statement.subject))
                && predicate.bind(&mut candidate, statement.predicate.into())
                && object.bind(&mut candidate, statement.object)
            {
                extended.push(candidate);
            }
        }
    }
    Ok(extended)
}

fn subject_term(subject: RdfSubject) -> RdfObject {
    subject.into()
}

fn join(left: &[Solution], right: &[Solution]) -> Vec<Solution> {
    let mut joined = Vec::new();
    for l in left {
        for r in right {
            let compatible = r
                .iter()
                .all(|(name, value)| l.get(name).map_or(true, |existing| existing == value));
            if compatible {
                let mut merged = l.clone();
                merged.extend(r.iter().map(|(k, v)| (k.clone(), v.clone())));
                joined.push(merged);
            }
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::parse_construct;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let bag = BlankNode::new();
        store.insert(Statement::new(
            iri("http://example.org/p").into(),
            iri("http://example.org/children"),
            bag.clone().into(),
        ));
        store.insert(Statement::new(
            bag.clone().into(),
            iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag").into(),
        ));
        store.insert(Statement::new(
            bag.into(),
            iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#_1"),
            iri("http://example.org/a").into(),
        ));
        store.insert(Statement::new(
            iri("http://example.org/q").into(),
            iri("http://example.org/children"),
            iri("http://example.org/a").into(),
        ));
        store
    }

    #[test]
    fn test_construct_union_through_container() {
        let query = parse_construct(
            r#"CONSTRUCT { ?s <http://example.org/children> <http://example.org/a> }
               WHERE {
                 { ?s <http://example.org/children> <http://example.org/a> }
                 UNION
                 { ?s <http://example.org/children> ?c .
                   ?c a <http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag> .
                   ?c ?m <http://example.org/a> }
               }"#,
        )
        .unwrap();

        let result = evaluate(&store(), &query).unwrap();
        let mut subjects: Vec<_> = result.iter().map(|s| s.subject.to_string()).collect();
        subjects.sort();
        assert_eq!(
            subjects,
            vec!["<http://example.org/p>".to_string(), "<http://example.org/q>".to_string()]
        );
    }

    #[test]
    fn test_unsupported_pattern() {
        let query = parse_construct(
            "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o FILTER(?o = 1) }",
        )
        .unwrap();
        assert!(matches!(
            evaluate(&store(), &query),
            Err(QueryError::Unsupported(_))
        ));
    }
}
