//! Dynamic property values shared by items, proxies and live instances.

use crate::ItemId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row-major 3x3 identity
pub const IDENTITY_MATRIX: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Three components (position, scale, orientation in degrees, ...)
    Vector([f64; 3]),
    /// Row-major 3x3 matrix
    Matrix([f64; 9]),
    Id(Option<ItemId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Vector,
    Matrix,
    Id,
}

impl ValueKind {
    /// Value a fresh property of this kind starts with
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Null => Value::Null,
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Text => Value::Text(String::new()),
            ValueKind::Vector => Value::Vector([0.0; 3]),
            ValueKind::Matrix => Value::Matrix(IDENTITY_MATRIX),
            ValueKind::Id => Value::Id(None),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Vector => "vector",
            ValueKind::Matrix => "matrix",
            ValueKind::Id => "id",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Vector(_) => ValueKind::Vector,
            Value::Matrix(_) => ValueKind::Matrix,
            Value::Id(_) => ValueKind::Id,
        }
    }

    /// Convert to `kind` where the conversion is lossless.
    ///
    /// Null text becomes the empty string and a null id becomes `Id(None)`;
    /// integers widen to floats. Anything else must already match.
    pub fn coerce(self, kind: ValueKind) -> Option<Value> {
        match (self, kind) {
            (Value::Null, ValueKind::Text) => Some(Value::Text(String::new())),
            (Value::Null, ValueKind::Id) => Some(Value::Id(None)),
            (Value::Int(i), ValueKind::Float) => Some(Value::Float(i as f64)),
            (value, kind) if value.kind() == kind => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<[f64; 3]> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<[f64; 9]> {
        match self {
            Value::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<Option<ItemId>> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Vector([x, y, z]) => write!(f, "({}, {}, {})", x, y, z),
            Value::Matrix(m) => write!(f, "{:?}", m),
            Value::Id(Some(id)) => write!(f, "{}", id),
            Value::Id(None) => f.write_str("none"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Value::Vector(v)
    }
}

impl From<ItemId> for Value {
    fn from(id: ItemId) -> Self {
        Value::Id(Some(id))
    }
}

impl From<Option<ItemId>> for Value {
    fn from(id: Option<ItemId>) -> Self {
        Value::Id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_text_coerces_to_empty() {
        assert_eq!(
            Value::Null.coerce(ValueKind::Text),
            Some(Value::Text(String::new()))
        );
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(Value::Int(3).coerce(ValueKind::Float), Some(Value::Float(3.0)));
        assert_eq!(Value::Float(3.0).coerce(ValueKind::Int), None);
    }

    #[test]
    fn test_mismatched_kind_is_rejected() {
        assert_eq!(Value::from("x").coerce(ValueKind::Bool), None);
        assert_eq!(Value::Null.coerce(ValueKind::Vector), None);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&Value::Vector([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(json, r#"{"kind":"vector","value":[1.0,2.0,3.0]}"#);

        let back: Value = serde_json::from_str(r#"{"kind":"text","value":"Door"}"#).unwrap();
        assert_eq!(back, Value::from("Door"));

        let null: Value = serde_json::from_str(r#"{"kind":"null"}"#).unwrap();
        assert!(null.is_null());
    }

    #[test]
    fn test_default_values_match_kind() {
        for kind in [
            ValueKind::Bool,
            ValueKind::Int,
            ValueKind::Float,
            ValueKind::Text,
            ValueKind::Vector,
            ValueKind::Matrix,
            ValueKind::Id,
        ] {
            assert_eq!(kind.default_value().kind(), kind);
        }
    }
}
