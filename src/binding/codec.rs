//! Scalar ↔ literal conversion

use super::value::Value;
use crate::rdf::{vocab, Literal};

/// Converts scalar values to literals and back
pub trait LiteralCodec: Send + Sync {
    /// None when the value has no literal form
    fn to_literal(&self, value: &Value) -> Option<Literal>;

    fn from_literal(&self, literal: &Literal) -> Value;
}

/// XML Schema datatype codec
///
/// Booleans, integers and doubles map to `xsd:boolean`, `xsd:long` and
/// `xsd:double`. Strings become simple literals. Literals of any other
/// datatype or with a language tag are passed through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct XsdLiteralCodec;

const INTEGER_TYPES: &[&str] = &[
    "long",
    "int",
    "integer",
    "short",
    "byte",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "positiveInteger",
    "negativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

const DECIMAL_TYPES: &[&str] = &["double", "float", "decimal"];

impl LiteralCodec for XsdLiteralCodec {
    fn to_literal(&self, value: &Value) -> Option<Literal> {
        match value {
            Value::Bool(b) => {
                Some(Literal::new_typed_literal(b.to_string(), vocab::xsd("boolean")))
            }
            Value::Integer(i) => {
                Some(Literal::new_typed_literal(i.to_string(), vocab::xsd("long")))
            }
            Value::Double(d) => {
                Some(Literal::new_typed_literal(format_double(*d), vocab::xsd("double")))
            }
            Value::String(s) => Some(Literal::new_simple_literal(s.as_str())),
            Value::Literal(l) => Some(l.clone()),
            _ => None,
        }
    }

    fn from_literal(&self, literal: &Literal) -> Value {
        if literal.language().is_some() {
            return Value::Literal(literal.clone());
        }

        let datatype = literal.datatype();
        let local = match datatype.as_str().strip_prefix(vocab::XSD) {
            Some(local) => local,
            None => return Value::Literal(literal.clone()),
        };
        let lexical = literal.value().trim();

        let decoded = match local {
            "string" => Some(Value::String(literal.value().to_string())),
            "boolean" => match lexical {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            t if INTEGER_TYPES.contains(&t) => lexical.parse::<i64>().ok().map(Value::Integer),
            t if DECIMAL_TYPES.contains(&t) => parse_double(lexical).map(Value::Double),
            _ => None,
        };
        decoded.unwrap_or_else(|| Value::Literal(literal.clone()))
    }
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        d.to_string()
    }
}

fn parse_double(lexical: &str) -> Option<f64> {
    match lexical {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_keep_their_type() {
        let codec = XsdLiteralCodec;
        for value in [
            Value::Bool(true),
            Value::Integer(-42),
            Value::Double(2.5),
            Value::String("Alice".into()),
        ] {
            let literal = codec.to_literal(&value).unwrap();
            assert_eq!(codec.from_literal(&literal), value);
        }
    }

    #[test]
    fn test_datatypes_written() {
        let codec = XsdLiteralCodec;
        let literal = codec.to_literal(&Value::Integer(7)).unwrap();
        assert_eq!(literal.datatype().as_str(), "http://www.w3.org/2001/XMLSchema#long");
        let literal = codec.to_literal(&Value::Double(f64::INFINITY)).unwrap();
        assert_eq!(literal.value(), "INF");
        assert!(codec.to_literal(&Value::Null).is_none());
    }

    #[test]
    fn test_foreign_literals_pass_through() {
        let codec = XsdLiteralCodec;
        let tagged = Literal::new_language_tagged_literal("chat", "fr").unwrap();
        assert_eq!(codec.from_literal(&tagged), Value::Literal(tagged.clone()));

        let date = Literal::new_typed_literal("2024-01-01", vocab::xsd("date"));
        assert_eq!(codec.from_literal(&date), Value::Literal(date.clone()));

        let bad = Literal::new_typed_literal("many", vocab::xsd("int"));
        assert_eq!(codec.from_literal(&bad), Value::Literal(bad.clone()));

        let int = Literal::new_typed_literal("12", vocab::xsd("int"));
        assert_eq!(codec.from_literal(&int), Value::Integer(12));
    }
}
