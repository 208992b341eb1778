//! Snapshot value representation
//!
//! This module defines the [`Value`] enum, the closed set of shapes a variable can
//! take once it has been captured into a step record. Unlike the live objects of the
//! scripting interpreter, a `Value` owns its whole subtree: cloning one yields a
//! structurally independent copy, so a recorded step can never observe a later
//! mutation.
//!
//! # Value Types
//!
//! - [`Value::Unset`]: undefined variable, or the scripting `None`
//! - [`Value::Int`] / [`Value::Real`] / [`Value::Bool`] / [`Value::Str`]: scalars
//! - [`Value::Bits`]: fixed-width bit-string such as an 8-bit byte
//! - [`Value::List`]: arrays, tuples and queues
//! - [`Value::Record`]: named fields in declared order (queue items, dicts, frames)
//! - [`Value::Node`]: linked-list cell pointing at its successor by index
//! - [`Value::Opaque`]: anything without a structural form, kept as display text

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// A captured variable value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Unset,
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    Bits { width: u8, bits: u64 },
    List(Vec<Value>),
    Record(IndexMap<String, Value>),
    Node { value: Box<Value>, next: Option<usize> },
    Opaque(String),
}

impl Value {
    pub fn str(text: impl Into<String>) -> Self {
        Value::Str(text.into())
    }

    /// Bit-string of `width` bits; higher bits of `bits` are dropped.
    pub fn bits(width: u8, bits: u64) -> Self {
        let width = width.min(64);
        let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };
        Value::Bits { width, bits: bits & mask }
    }

    /// Parse a string of `0`/`1` digits into a bit-string of the same width.
    pub fn parse_bits(digits: &str) -> Option<Self> {
        if digits.is_empty() || digits.len() > 64 {
            return None;
        }
        let bits = u64::from_str_radix(digits, 2).ok()?;
        Some(Value::bits(digits.len() as u8, bits))
    }

    pub fn node(value: Value, next: Option<usize>) -> Self {
        Value::Node {
            value: Box::new(value),
            next,
        }
    }

    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn ints(items: &[i64]) -> Self {
        Value::List(items.iter().map(|&n| Value::Int(n)).collect())
    }

    pub fn strs(items: &[&str]) -> Self {
        Value::List(items.iter().map(|s| Value::str(*s)).collect())
    }

    /// Check if this value has been assigned
    pub fn is_set(&self) -> bool {
        !matches!(self, Value::Unset)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bits { bits, .. } => i64::try_from(*bits).ok(),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Real(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Field lookup on records; nodes expose `val` and `next`
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Record(fields) => fields.get(name).cloned(),
            Value::Node { value, next } => match name {
                "val" | "value" => Some((**value).clone()),
                "next" => Some(next.map_or(Value::Unset, |i| Value::Int(i as i64))),
                _ => None,
            },
            _ => None,
        }
    }

    /// Successor index of a linked node
    pub fn next_index(&self) -> Option<usize> {
        match self {
            Value::Node { next, .. } => *next,
            _ => None,
        }
    }

    /// Convert a JSON document into a value.
    ///
    /// Objects with exactly the keys `val` and `next` (where `next` is an index or
    /// null) become [`Value::Node`]; other objects become records.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Unset,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => {
                if map.len() == 2 {
                    if let (Some(val), Some(next)) = (map.get("val"), map.get("next")) {
                        let next = match next {
                            Json::Null => Some(None),
                            Json::Number(n) => n.as_u64().map(|i| Some(i as usize)),
                            _ => None,
                        };
                        if let Some(next) = next {
                            return Value::node(Value::from_json(val), next);
                        }
                    }
                }
                Value::Record(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Short type name shown next to values in the viewer
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unset => "unset",
            Value::Int(_) => "int",
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Bits { .. } => "bits",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Node { .. } => "node",
            Value::Opaque(_) => "object",
        }
    }
}

/// Format a real the way learners expect to read it: integral values keep a
/// trailing `.0`, very large or very small magnitudes switch to exponent form.
pub fn format_real(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", x);
        return match text.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            None => text,
        };
    }
    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => write!(f, "null"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Real(x) => write!(f, "{}", format_real(*x)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Bits { width, bits } => {
                write!(f, "{:0width$b}", bits, width = *width as usize)
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Node { value, next } => match next {
                Some(i) => write!(f, "{{val: {}, next: {}}}", value, i),
                None => write!(f, "{{val: {}, next: null}}", value),
            },
            Value::Opaque(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Unset => serializer.serialize_none(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Real(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Str(s) | Value::Opaque(s) => serializer.serialize_str(s),
            Value::Bits { .. } => serializer.serialize_str(&self.to_string()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Value::Node { value, next } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("val", value)?;
                map.serialize_entry("next", next)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_shapes() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Real(2.0).to_string(), "2.0");
        assert_eq!(Value::Real(0.25).to_string(), "0.25");
        assert_eq!(Value::str("A").to_string(), "\"A\"");
        assert_eq!(Value::ints(&[1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Unset.to_string(), "null");
        assert_eq!(
            Value::record([("value", Value::str("A")), ("prio", Value::Int(1))]).to_string(),
            "{value: \"A\", prio: 1}"
        );
        assert_eq!(Value::node(Value::str("B"), None).to_string(), "{val: \"B\", next: null}");
    }

    #[test]
    fn test_bits_are_masked_and_padded() {
        let byte = Value::parse_bits("01001011").unwrap();
        assert_eq!(byte.to_string(), "01001011");
        assert_eq!(Value::bits(8, 0x1ff).to_string(), "11111111");
        assert!(Value::parse_bits("0102").is_none());
    }

    #[test]
    fn test_real_exponent_form() {
        assert_eq!(format_real(1e20), "1e+20");
        assert_eq!(format_real(1e-5), "1e-05");
        assert_eq!(format_real(-0.5), "-0.5");
    }

    #[test]
    fn test_from_json_detects_nodes() {
        let json: serde_json::Value =
            serde_json::from_str(r#"[{"val": "A", "next": 1}, {"val": "B", "next": null}]"#)
                .unwrap();
        let value = Value::from_json(&json);
        let items = value.as_list().unwrap();
        assert_eq!(items[0].next_index(), Some(1));
        assert_eq!(items[1].next_index(), None);
        assert_eq!(items[1].field("val"), Some(Value::str("B")));
    }

    #[test]
    fn test_serialize_node_and_unset() {
        let value = Value::List(vec![Value::node(Value::str("A"), Some(2)), Value::Unset]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[{"val":"A","next":2},null]"#);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = Value::List(vec![Value::ints(&[1, 2])]);
        let copy = original.clone();
        if let Some(items) = original.as_list_mut() {
            items[0].as_list_mut().unwrap().push(Value::Int(3));
        }
        assert_eq!(copy, Value::List(vec![Value::ints(&[1, 2])]));
    }
}
