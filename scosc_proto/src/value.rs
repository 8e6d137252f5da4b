//! The runtime value model seen by the codec.

use alloc::{string::String, vec::Vec};
use serde::{Deserialize, Serialize};

/// A runtime value, as far as OSC is concerned.
///
/// `Float` and `Double` are both the "numeric fallback" kind: on the wire they become
/// `f` or `d` depending only on whether double precision is enabled at encode time, not on
/// which variant they are. Decoding maps `f` to `Float` and `d` to `Double`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Char(char),
    Int(i32),
    Float(f32),
    Double(f64),
    Symbol(String),
    String(String),
    Blob(Vec<u8>),
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Char(_) => "char",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Symbol(_) => "symbol",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
            Value::Array(_) => "array",
        }
    }

    /// Numeric view of `Int`, `Float` and `Double`.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(i) => Some(i.into()),
            Value::Float(f) => Some(f.into()),
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    /// Text of a `Symbol` or `String`.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) | Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Whether an aggregate should be encoded as a nested bundle rather than a message.
    ///
    /// The convention is to peek at the element right after the first one: an array there
    /// means `[time, [msg...], [msg...]]`. This is ambiguous for a message whose first
    /// argument is itself an array, which is then taken for a bundle.
    #[inline]
    pub fn looks_like_bundle(items: &[Value]) -> bool {
        matches!(items.get(1), Some(Value::Array(_)))
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.into())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
