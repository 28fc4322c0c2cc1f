use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;

/// A value held by a value node or an unconnected input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    Scalar(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
    Point([f64; 3]),
    Sequence(Vec<NodeValue>),
}

/// Tag naming a value variant in documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Scalar,
    Integer,
    Boolean,
    Text,
    Point,
    Sequence,
}

/// A JSON value that could not be read as the requested kind
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot read {kind} value from {found}")]
pub struct MalformedValue {
    pub kind: ValueKind,
    pub found: String,
}

impl MalformedValue {
    fn new(kind: ValueKind, found: &Json) -> Self {
        Self {
            kind,
            found: found.to_string(),
        }
    }
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Scalar => "scalar",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Text => "text",
            ValueKind::Point => "point",
            ValueKind::Sequence => "sequence",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" | "number" => Ok(ValueKind::Scalar),
            "integer" | "int" => Ok(ValueKind::Integer),
            "boolean" | "bool" => Ok(ValueKind::Boolean),
            "text" | "string" => Ok(ValueKind::Text),
            "point" => Ok(ValueKind::Point),
            "sequence" | "list" => Ok(ValueKind::Sequence),
            other => Err(format!("Unknown value type: {}", other)),
        }
    }
}

impl NodeValue {
    /// Get the tag of this value
    ///
    /// A sequence whose items all share one non-sequence kind reports that
    /// kind, so the tag round-trips through `decode`.
    pub fn kind(&self) -> ValueKind {
        match self {
            NodeValue::Scalar(_) => ValueKind::Scalar,
            NodeValue::Integer(_) => ValueKind::Integer,
            NodeValue::Boolean(_) => ValueKind::Boolean,
            NodeValue::Text(_) => ValueKind::Text,
            NodeValue::Point(_) => ValueKind::Point,
            NodeValue::Sequence(items) => {
                let mut kinds = items.iter().map(|item| item.kind());
                match kinds.next() {
                    Some(first) if first != ValueKind::Sequence && kinds.all(|k| k == first) => {
                        first
                    }
                    _ => ValueKind::Sequence,
                }
            }
        }
    }

    /// Nesting depth: 0 for a single item, 1 for a flat sequence, and so on
    pub fn depth(&self) -> usize {
        match self {
            NodeValue::Sequence(items) => 1 + items.iter().map(|i| i.depth()).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Number of top-level items (1 for a single item)
    pub fn item_count(&self) -> usize {
        match self {
            NodeValue::Sequence(items) => items.len(),
            _ => 1,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Encode as document JSON
    pub fn to_json(&self) -> Json {
        match self {
            NodeValue::Scalar(n) => Json::from(*n),
            NodeValue::Integer(n) => Json::from(*n),
            NodeValue::Boolean(b) => Json::Bool(*b),
            NodeValue::Text(s) => Json::String(s.clone()),
            NodeValue::Point([x, y, z]) => Json::Array(vec![(*x).into(), (*y).into(), (*z).into()]),
            NodeValue::Sequence(items) => Json::Array(items.iter().map(|i| i.to_json()).collect()),
        }
    }
}

// ========== Decoding ==========

type Decoder = fn(&Json) -> Result<NodeValue, MalformedValue>;

/// Decoders for a single (non-sequence) item, keyed by tag
const DECODERS: &[(ValueKind, Decoder)] = &[
    (ValueKind::Scalar, decode_scalar),
    (ValueKind::Integer, decode_integer),
    (ValueKind::Boolean, decode_boolean),
    (ValueKind::Text, decode_text),
    (ValueKind::Point, decode_point),
    (ValueKind::Sequence, decode_any),
];

/// Decode document JSON as the given kind
///
/// Arrays become sequences of items of that kind, except that a point may
/// itself be written as a three-number array.
pub fn decode(kind: ValueKind, json: &Json) -> Result<NodeValue, MalformedValue> {
    if let Json::Array(items) = json {
        if !(kind == ValueKind::Point && is_triple(items)) {
            return items
                .iter()
                .map(|item| decode(kind, item))
                .collect::<Result<Vec<_>, _>>()
                .map(NodeValue::Sequence);
        }
    }

    let decoder = DECODERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, d)| *d)
        .unwrap_or(decode_any);
    decoder(json)
}

fn is_triple(items: &[Json]) -> bool {
    items.len() == 3 && items.iter().all(Json::is_number)
}

fn decode_scalar(json: &Json) -> Result<NodeValue, MalformedValue> {
    let number = match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .map(NodeValue::Scalar)
        .ok_or_else(|| MalformedValue::new(ValueKind::Scalar, json))
}

fn decode_integer(json: &Json) -> Result<NodeValue, MalformedValue> {
    let number = match json {
        Json::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| is_whole_i64(*f)).map(|f| f as i64)),
        Json::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    number
        .map(NodeValue::Integer)
        .ok_or_else(|| MalformedValue::new(ValueKind::Integer, json))
}

/// Whole float that fits in an `i64` without saturating
fn is_whole_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn decode_boolean(json: &Json) -> Result<NodeValue, MalformedValue> {
    let flag = match json {
        Json::Bool(b) => Some(*b),
        Json::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    };
    flag.map(NodeValue::Boolean)
        .ok_or_else(|| MalformedValue::new(ValueKind::Boolean, json))
}

fn decode_text(json: &Json) -> Result<NodeValue, MalformedValue> {
    match json {
        Json::String(s) => Ok(NodeValue::Text(s.clone())),
        Json::Number(_) | Json::Bool(_) => Ok(NodeValue::Text(json.to_string())),
        _ => Err(MalformedValue::new(ValueKind::Text, json)),
    }
}

fn decode_point(json: &Json) -> Result<NodeValue, MalformedValue> {
    let coords = match json {
        Json::String(s) => parse_point_literal(s),
        Json::Object(map) => {
            let axis = |name: &str| map.get(name).and_then(Json::as_f64);
            match (axis("x"), axis("y")) {
                (Some(x), Some(y)) => Some([x, y, axis("z").unwrap_or(0.0)]),
                _ => None,
            }
        }
        Json::Array(items) if is_triple(items) => {
            let mut coords = [0.0; 3];
            for (slot, item) in coords.iter_mut().zip(items) {
                *slot = item.as_f64().unwrap_or(0.0);
            }
            Some(coords)
        }
        _ => None,
    };
    coords
        .map(NodeValue::Point)
        .ok_or_else(|| MalformedValue::new(ValueKind::Point, json))
}

/// Self-describing decoding used when no tag is known
fn decode_any(json: &Json) -> Result<NodeValue, MalformedValue> {
    match json {
        Json::Number(n) => match n.as_i64() {
            Some(i) if !n.is_f64() => Ok(NodeValue::Integer(i)),
            _ => decode_scalar(json),
        },
        Json::Bool(b) => Ok(NodeValue::Boolean(*b)),
        Json::String(s) => Ok(NodeValue::Text(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(decode_any)
            .collect::<Result<Vec<_>, _>>()
            .map(NodeValue::Sequence),
        Json::Object(_) => decode_point(json),
        Json::Null => Err(MalformedValue::new(ValueKind::Sequence, json)),
    }
}

// ========== Point literals ==========

const POINT_LITERAL: &str = r"^\s*\{?\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*,\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*,\s*([-+]?[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?)\s*\}?\s*$";

fn point_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(POINT_LITERAL).ok()).as_ref()
}

/// Parse a point written as "{a, b, c}" (braces optional)
pub fn parse_point_literal(text: &str) -> Option<[f64; 3]> {
    let caps = point_pattern()?.captures(text)?;
    let mut coords = [0.0; 3];
    for (i, slot) in coords.iter_mut().enumerate() {
        *slot = caps.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_pattern_compiles() {
        assert!(point_pattern().is_some());
    }

    #[test]
    fn test_point_literals() {
        assert_eq!(parse_point_literal("{1, 2, 3}"), Some([1.0, 2.0, 3.0]));
        assert_eq!(parse_point_literal("{-1.5,0,2e2}"), Some([-1.5, 0.0, 200.0]));
        assert_eq!(parse_point_literal("4,5,6"), Some([4.0, 5.0, 6.0]));
        assert_eq!(parse_point_literal("{1, 2}"), None);
        assert_eq!(parse_point_literal("{a, b, c}"), None);
    }

    #[test]
    fn test_decode_point_forms() {
        let expected = NodeValue::Point([1.0, 2.0, 3.0]);
        assert_eq!(decode(ValueKind::Point, &json!("{1,2,3}")).unwrap(), expected);
        assert_eq!(decode(ValueKind::Point, &json!({"x": 1, "y": 2, "z": 3})).unwrap(), expected);
        assert_eq!(decode(ValueKind::Point, &json!([1, 2, 3])).unwrap(), expected);
    }

    #[test]
    fn test_decode_sequence_of_points() {
        let value = decode(ValueKind::Point, &json!([[0, 0, 0], "{1,1,1}"])).unwrap();
        assert_eq!(
            value,
            NodeValue::Sequence(vec![
                NodeValue::Point([0.0, 0.0, 0.0]),
                NodeValue::Point([1.0, 1.0, 1.0]),
            ])
        );
        assert_eq!(value.kind(), ValueKind::Point);
    }

    #[test]
    fn test_decode_from_strings() {
        assert_eq!(decode(ValueKind::Scalar, &json!("3.5")).unwrap(), NodeValue::Scalar(3.5));
        assert_eq!(decode(ValueKind::Integer, &json!("42")).unwrap(), NodeValue::Integer(42));
        assert_eq!(decode(ValueKind::Boolean, &json!("True")).unwrap(), NodeValue::Boolean(true));
        assert_eq!(decode(ValueKind::Text, &json!(7)).unwrap(), NodeValue::Text("7".into()));
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode(ValueKind::Scalar, &json!("abc")).unwrap_err();
        assert_eq!(err.kind, ValueKind::Scalar);
        assert!(decode(ValueKind::Point, &json!("{1, x, 3}")).is_err());
        assert!(decode(ValueKind::Boolean, &json!(1)).is_err());
    }

    #[test]
    fn test_decode_integer_range() {
        assert_eq!(decode(ValueKind::Integer, &json!(3.0)).unwrap(), NodeValue::Integer(3));
        assert_eq!(
            decode(ValueKind::Integer, &json!(-9007199254740992.0)).unwrap(),
            NodeValue::Integer(-9007199254740992)
        );
        let err = decode(ValueKind::Integer, &json!(1e30)).unwrap_err();
        assert_eq!(err.kind, ValueKind::Integer);
        assert!(decode(ValueKind::Integer, &json!(-1e30)).is_err());
        assert!(decode(ValueKind::Integer, &json!(9223372036854775808.0)).is_err());
        assert!(decode(ValueKind::Integer, &json!(2.5)).is_err());
    }

    #[test]
    fn test_untagged_decoding() {
        let value = decode(ValueKind::Sequence, &json!([1, 2.5, true, "a"])).unwrap();
        assert_eq!(
            value,
            NodeValue::Sequence(vec![
                NodeValue::Integer(1),
                NodeValue::Scalar(2.5),
                NodeValue::Boolean(true),
                NodeValue::Text("a".into()),
            ])
        );
        assert_eq!(value.kind(), ValueKind::Sequence);
    }

    #[test]
    fn test_encode_decode_keeps_kind() {
        let values = vec![
            NodeValue::Scalar(2.0),
            NodeValue::Integer(-3),
            NodeValue::Point([1.0, 0.5, 0.0]),
            NodeValue::Sequence(vec![NodeValue::Text("a".into()), NodeValue::Text("b".into())]),
        ];
        for value in values {
            let decoded = decode(value.kind(), &value.to_json()).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_depth_and_count() {
        let nested = NodeValue::Sequence(vec![
            NodeValue::Sequence(vec![NodeValue::Integer(1)]),
            NodeValue::Integer(2),
        ]);
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.item_count(), 2);
        assert_eq!(NodeValue::Integer(1).depth(), 0);
        assert_eq!(NodeValue::Sequence(vec![]).depth(), 1);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Point".parse::<ValueKind>().unwrap(), ValueKind::Point);
        assert_eq!("number".parse::<ValueKind>().unwrap(), ValueKind::Scalar);
        assert!("brep".parse::<ValueKind>().is_err());
    }
}
