//! Collection encodings
//!
//! A collection property is stored in one of five shapes:
//!
//! - plain: one `(node, p, value)` statement per element
//! - bag / seq / alt: `(node, p, _:c)`, `(_:c, rdf:type, rdf:Bag|Seq|Alt)`,
//!   then `(_:c, rdf:_1, v1)`, `(_:c, rdf:_2, v2)` ...
//! - list: an `rdf:first` / `rdf:rest` chain ending in `rdf:nil`. An empty
//!   list is `(node, p, _:b)` plus `(_:b, rdf:rest, rdf:nil)` and no
//!   `rdf:first`.
//!
//! Decoding detects the shape from what is in the store, not from the
//! property declaration, so data written under another layout still reads.

use super::descriptor::{ContainerKind, PropertyDescriptor};
use super::lock::WriteLocks;
use crate::rdf::{
    vocab, BlankNode, GraphName, NamedNode, RdfObject, RdfSubject, Statement, StatementPattern,
};
use crate::store::{Connection, StoreResult};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use tracing::debug;

/// Write the elements of a collection property
pub fn write_collection(
    conn: &dyn Connection,
    node: &RdfSubject,
    property: &PropertyDescriptor,
    elements: &[RdfObject],
    graphs: &[GraphName],
) -> StoreResult<()> {
    let predicate = &property.predicate;
    match property.container {
        ContainerKind::None => {
            for element in elements {
                conn.add_statement(node, predicate, element, graphs)?;
            }
        }
        ContainerKind::Bag | ContainerKind::Seq | ContainerKind::Alt => {
            let container: RdfSubject = BlankNode::new().into();
            conn.add_statement(node, predicate, &container.clone().into(), graphs)?;
            if let Some(class) = property.container.rdf_type() {
                conn.add_statement(&container, &vocab::rdf_type(), &class.into(), graphs)?;
            }
            for (i, element) in elements.iter().enumerate() {
                conn.add_statement(&container, &vocab::rdf_member(i + 1), element, graphs)?;
            }
        }
        ContainerKind::List => {
            let nil: RdfObject = vocab::rdf_nil().into();
            let mut cell: RdfSubject = BlankNode::new().into();
            conn.add_statement(node, predicate, &cell.clone().into(), graphs)?;
            if elements.is_empty() {
                conn.add_statement(&cell, &vocab::rdf_rest(), &nil, graphs)?;
                return Ok(());
            }
            for (i, element) in elements.iter().enumerate() {
                conn.add_statement(&cell, &vocab::rdf_first(), element, graphs)?;
                if i + 1 == elements.len() {
                    conn.add_statement(&cell, &vocab::rdf_rest(), &nil, graphs)?;
                } else {
                    let next: RdfSubject = BlankNode::new().into();
                    conn.add_statement(&cell, &vocab::rdf_rest(), &next.clone().into(), graphs)?;
                    cell = next;
                }
            }
        }
    }
    Ok(())
}

/// Terms held by a forward property, containers and lists flattened
pub fn read_forward(
    conn: &dyn Connection,
    node: &RdfSubject,
    property: &PropertyDescriptor,
    graphs: &[GraphName],
) -> StoreResult<Vec<RdfObject>> {
    let objects: Vec<RdfObject> = conn
        .get_statements(&StatementPattern::forward(node, &property.predicate), graphs)?
        .map(|s| s.object)
        .collect();

    if !property.is_collection() {
        return Ok(objects.into_iter().take(1).collect());
    }

    let mut terms = Vec::new();
    for object in objects {
        match decode_structure(conn, &object, graphs)? {
            Some(elements) => terms.extend(elements),
            None => terms.push(object),
        }
    }
    Ok(terms)
}

/// Subjects pointing at `node` through an inverse property
///
/// With `fallback`, an empty direct match on an IRI node retries with a
/// CONSTRUCT query that also looks through bag/seq/alt containers.
pub fn read_inverse(
    conn: &dyn Connection,
    node: &RdfSubject,
    property: &PropertyDescriptor,
    graphs: &[GraphName],
    fallback: bool,
) -> StoreResult<Vec<RdfObject>> {
    let mut seen = FxHashSet::default();
    let mut subjects: Vec<RdfObject> = conn
        .get_statements(&StatementPattern::reverse(&property.predicate, node), graphs)?
        .map(|s| RdfObject::from(s.subject))
        .filter(|s| seen.insert(s.clone()))
        .collect();

    if subjects.is_empty() && fallback {
        if let Some(iri) = node.as_named_node() {
            let query = inverse_query(&property.predicate, iri);
            debug!("Inverse fallback query for {} {}", iri, property.predicate);
            subjects = conn
                .evaluate_graph_query(&query)?
                .into_iter()
                .map(|s| RdfObject::from(s.subject))
                .filter(|s| seen.insert(s.clone()))
                .collect();
        }
    }

    if !property.is_collection() {
        subjects.truncate(1);
    }
    Ok(subjects)
}

fn inverse_query(predicate: &NamedNode, node: &NamedNode) -> String {
    let through = |class: &str| {
        format!(
            "{{ ?s {p} ?c . ?c <{t}> <{class}> . ?c ?m {n} }}",
            p = predicate,
            t = vocab::RDF_TYPE,
            class = class,
            n = node
        )
    };
    format!(
        "CONSTRUCT {{ ?s {p} {n} }} WHERE {{ {{ ?s {p} {n} }} UNION {bag} UNION {seq} UNION {alt} }}",
        p = predicate,
        n = node,
        bag = through(vocab::RDF_BAG),
        seq = through(vocab::RDF_SEQ),
        alt = through(vocab::RDF_ALT),
    )
}

/// Elements of a container or list rooted at `term`; None if it is neither
pub fn decode_structure(
    conn: &dyn Connection,
    term: &RdfObject,
    graphs: &[GraphName],
) -> StoreResult<Option<Vec<RdfObject>>> {
    let root = match term {
        RdfObject::NamedNode(n) if n.as_str() == vocab::RDF_NIL => return Ok(Some(Vec::new())),
        RdfObject::BlankNode(b) => RdfSubject::from(b.clone()),
        _ => return Ok(None),
    };

    let statements: Vec<Statement> = conn
        .get_statements(&StatementPattern::new(Some(root.clone()), None, None), graphs)?
        .collect();

    if is_container(&statements) {
        return Ok(Some(indexed_members(&statements)));
    }
    if is_list_cell(&statements) {
        let mut elements = Vec::new();
        let mut visited = FxHashSet::default();
        walk_list(conn, root, statements, graphs, &mut visited, &mut elements)?;
        return Ok(Some(elements));
    }
    Ok(None)
}

fn is_container(statements: &[Statement]) -> bool {
    statements.iter().any(|s| {
        s.predicate.as_str() == vocab::RDF_TYPE
            && matches!(&s.object, RdfObject::NamedNode(n)
                if [vocab::RDF_BAG, vocab::RDF_SEQ, vocab::RDF_ALT].contains(&n.as_str()))
    })
}

fn is_list_cell(statements: &[Statement]) -> bool {
    statements
        .iter()
        .any(|s| {
            let p = s.predicate.as_str();
            p == vocab::RDF_FIRST || p == vocab::RDF_REST
        })
}

/// Members in ascending `rdf:_n` order, stopping at the first gap
fn indexed_members(statements: &[Statement]) -> Vec<RdfObject> {
    let mut by_index: BTreeMap<usize, Vec<RdfObject>> = BTreeMap::new();
    for statement in statements {
        if let Some(i) = vocab::member_index(&statement.predicate) {
            by_index.entry(i).or_default().push(statement.object.clone());
        }
    }

    let mut members = Vec::new();
    let mut i = 1;
    while let Some(objects) = by_index.remove(&i) {
        members.extend(objects);
        i += 1;
    }
    members
}

fn walk_list(
    conn: &dyn Connection,
    cell: RdfSubject,
    statements: Vec<Statement>,
    graphs: &[GraphName],
    visited: &mut FxHashSet<RdfSubject>,
    elements: &mut Vec<RdfObject>,
) -> StoreResult<()> {
    if !visited.insert(cell) {
        return Ok(());
    }

    let mut rests = Vec::new();
    for statement in statements {
        match statement.predicate.as_str() {
            vocab::RDF_FIRST => elements.push(statement.object),
            vocab::RDF_REST => rests.push(statement.object),
            _ => {}
        }
    }

    // A cell with several rests branches; every branch is flattened in turn
    for rest in rests {
        let next = match rest.as_subject() {
            Some(next) if rest != RdfObject::from(vocab::rdf_nil()) => next,
            _ => continue,
        };
        let next_statements: Vec<Statement> = conn
            .get_statements(&StatementPattern::new(Some(next.clone()), None, None), graphs)?
            .collect();
        walk_list(conn, next, next_statements, graphs, visited, elements)?;
    }
    Ok(())
}

/// Remove a forward property's statements along with any container or list
/// structures they point to
pub fn clear_forward(
    conn: &dyn Connection,
    node: &RdfSubject,
    property: &PropertyDescriptor,
    graphs: &[GraphName],
) -> StoreResult<()> {
    let pattern = StatementPattern::forward(node, &property.predicate);
    if property.is_collection() {
        let objects: Vec<RdfObject> =
            conn.get_statements(&pattern, graphs)?.map(|s| s.object).collect();
        let mut visited = FxHashSet::default();
        for object in objects {
            remove_structure(conn, &object, graphs, &mut visited)?;
        }
    }
    conn.remove_statements(&pattern, graphs)?;
    Ok(())
}

/// Remove the container or list rooted at `term`, if it is one
pub fn remove_structure(
    conn: &dyn Connection,
    term: &RdfObject,
    graphs: &[GraphName],
    visited: &mut FxHashSet<RdfSubject>,
) -> StoreResult<()> {
    let root = match term {
        RdfObject::BlankNode(b) => RdfSubject::from(b.clone()),
        _ => return Ok(()),
    };
    if !visited.insert(root.clone()) {
        return Ok(());
    }

    let pattern = StatementPattern::new(Some(root), None, None);
    let statements: Vec<Statement> = conn.get_statements(&pattern, graphs)?.collect();
    if is_container(&statements) {
        conn.remove_statements(&pattern, graphs)?;
    } else if is_list_cell(&statements) {
        conn.remove_statements(&pattern, graphs)?;
        for statement in statements {
            if statement.predicate.as_str() == vocab::RDF_REST {
                remove_structure(conn, &statement.object, graphs, visited)?;
            }
        }
    }
    Ok(())
}

/// Remove every `(s, p, node)` for an inverse property
///
/// Each subject is write-locked into `locks` first.
pub fn clear_inverse(
    conn: &dyn Connection,
    locks: &mut WriteLocks<'_>,
    node: &RdfSubject,
    property: &PropertyDescriptor,
    graphs: &[GraphName],
) -> StoreResult<()> {
    let subjects: Vec<RdfSubject> = conn
        .get_statements(&StatementPattern::reverse(&property.predicate, node), graphs)?
        .map(|s| s.subject)
        .collect();

    for subject in subjects {
        locks.acquire(&subject);
        conn.remove_statements(
            &StatementPattern::new(
                Some(subject),
                Some(property.predicate.clone()),
                Some(node.clone().into()),
            ),
            graphs,
        )?;
    }
    Ok(())
}
