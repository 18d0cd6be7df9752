//! Turtle format implementation

use crate::rdf::{BlankNode, Literal, NamedNode, RdfObject, RdfSubject, Statement};
use super::{ParseError, ParseResult, SerializeError, SerializeResult};
use rio_api::formatter::TriplesFormatter;
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleFormatter, TurtleParser};
use std::io::{BufReader, Cursor};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Parse a Turtle document into default-graph statements
pub fn parse(input: &str) -> ParseResult<Vec<Statement>> {
    let cursor = Cursor::new(input);
    let mut reader = BufReader::new(cursor);
    let mut parser = TurtleParser::new(&mut reader, None);

    let mut statements = Vec::new();

    let res: Result<(), rio_turtle::TurtleError> = parser.parse_all(&mut |t| {
        let subject = convert_subject(t.subject).map_err(invalid_data)?;
        let predicate = NamedNode::new(t.predicate.iri).map_err(invalid_data)?;
        let object = convert_object(t.object).map_err(invalid_data)?;

        statements.push(Statement::new(subject, predicate, object));
        Ok(())
    });

    match res {
        Ok(_) => Ok(statements),
        Err(e) => Err(ParseError::Parse(e.to_string())),
    }
}

/// Serialize statements as Turtle (graph names are dropped)
pub fn serialize(statements: &[Statement]) -> SerializeResult<String> {
    let mut output = Vec::new();
    let mut formatter = TurtleFormatter::new(&mut output);

    for statement in statements {
        let subject = match &statement.subject {
            RdfSubject::NamedNode(n) => {
                rio_api::model::Subject::NamedNode(rio_api::model::NamedNode { iri: n.as_str() })
            }
            RdfSubject::BlankNode(b) => {
                rio_api::model::Subject::BlankNode(rio_api::model::BlankNode { id: b.as_str() })
            }
        };

        let predicate = rio_api::model::NamedNode {
            iri: statement.predicate.as_str(),
        };

        let datatype;
        let object = match &statement.object {
            RdfObject::NamedNode(n) => {
                rio_api::model::Term::NamedNode(rio_api::model::NamedNode { iri: n.as_str() })
            }
            RdfObject::BlankNode(b) => {
                rio_api::model::Term::BlankNode(rio_api::model::BlankNode { id: b.as_str() })
            }
            RdfObject::Literal(l) => {
                datatype = l.datatype();
                let literal = if let Some(language) = l.language() {
                    rio_api::model::Literal::LanguageTaggedString {
                        value: l.value(),
                        language,
                    }
                } else if datatype.as_str() == XSD_STRING {
                    rio_api::model::Literal::Simple { value: l.value() }
                } else {
                    rio_api::model::Literal::Typed {
                        value: l.value(),
                        datatype: rio_api::model::NamedNode {
                            iri: datatype.as_str(),
                        },
                    }
                };
                rio_api::model::Term::Literal(literal)
            }
        };

        formatter
            .format(&rio_api::model::Triple {
                subject,
                predicate,
                object,
            })
            .map_err(|e| SerializeError::Serialize(e.to_string()))?;
    }

    formatter
        .finish()
        .map_err(|e| SerializeError::Serialize(e.to_string()))?;

    String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
}

fn invalid_data(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
}

fn convert_subject(s: rio_api::model::Subject) -> Result<RdfSubject, ParseError> {
    match s {
        rio_api::model::Subject::NamedNode(n) => Ok(RdfSubject::NamedNode(
            NamedNode::new(n.iri).map_err(|e| ParseError::Parse(e.to_string()))?,
        )),
        rio_api::model::Subject::BlankNode(b) => Ok(RdfSubject::BlankNode(
            BlankNode::from_str(b.id).map_err(|e| ParseError::Parse(e.to_string()))?,
        )),
        _ => Err(ParseError::Parse("Unsupported subject type".to_string())),
    }
}

fn convert_object(o: rio_api::model::Term) -> Result<RdfObject, ParseError> {
    match o {
        rio_api::model::Term::NamedNode(n) => Ok(RdfObject::NamedNode(
            NamedNode::new(n.iri).map_err(|e| ParseError::Parse(e.to_string()))?,
        )),
        rio_api::model::Term::BlankNode(b) => Ok(RdfObject::BlankNode(
            BlankNode::from_str(b.id).map_err(|e| ParseError::Parse(e.to_string()))?,
        )),
        rio_api::model::Term::Literal(l) => match l {
            rio_api::model::Literal::Simple { value } => {
                Ok(RdfObject::Literal(Literal::new_simple_literal(value)))
            }
            rio_api::model::Literal::LanguageTaggedString { value, language } => {
                Ok(RdfObject::Literal(
                    Literal::new_language_tagged_literal(value, language)
                        .map_err(|e| ParseError::Parse(e.to_string()))?,
                ))
            }
            rio_api::model::Literal::Typed { value, datatype } => {
                let dt = NamedNode::new(datatype.iri)
                    .map_err(|e| ParseError::Parse(e.to_string()))?;
                Ok(RdfObject::Literal(Literal::new_typed_literal(value, dt)))
            }
        },
        _ => Err(ParseError::Parse("Unsupported object type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_fixture() {
        let input = r#"
            @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
            <http://example.org/p> <http://example.org/children> _:c .
            _:c a rdf:Bag ; rdf:_1 <http://example.org/a> ; rdf:_2 "b" .
        "#;
        let statements = parse(input).unwrap();
        assert_eq!(statements.len(), 4);
        assert!(statements.iter().all(|s| s.graph.is_none()));
    }

    #[test]
    fn test_serialize_keeps_literal_kinds() {
        let input = r#"<http://example.org/a> <http://example.org/b> "c", "d"@en, "3"^^<http://www.w3.org/2001/XMLSchema#long> ."#;
        let statements = parse(input).unwrap();
        let output = serialize(&statements).unwrap();
        assert!(output.contains("http://example.org/a"));
        assert!(output.contains("@en"));
        assert!(output.contains("XMLSchema#long"));
        assert_eq!(parse(&output).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_error() {
        assert!(parse("<http://example.org/a> <http://example.org/b> .").is_err());
    }
}
