//! Constant values carried by code values

use serde::{Deserialize, Serialize};

use crate::code::CodeValue;

/// A value that can appear in a constant table or as a container root
///
/// The set is closed: the serializer matches on it exhaustively and every
/// variant owns its payload outright, so nothing is ever shared between two
/// places in the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// The `None` singleton
    None,
    /// Boolean true
    True,
    /// Boolean false
    False,
    /// The `StopIteration` sentinel
    StopIteration,
    /// The `...` singleton
    Ellipsis,
    /// Signed 32-bit integer
    Int(i32),
    /// 64-bit float
    Float(f64),
    /// Text string
    Str(String),
    /// Raw byte string
    Bytes(Vec<u8>),
    /// Fixed-size tuple
    Tuple(Vec<Value>),
    /// Nested code value
    Code(Box<CodeValue>),
}

impl Value {
    /// Create a string value
    #[inline]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Create a bytes value
    #[inline]
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    /// Create a boolean value
    #[inline]
    pub fn bool(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }

    /// Get as nested code value
    #[inline]
    pub fn as_code(&self) -> Option<&CodeValue> {
        match self {
            Self::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<CodeValue> for Value {
    fn from(code: CodeValue) -> Self {
        Self::Code(Box::new(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Value::bool(true), Value::True);
        assert_eq!(Value::from(7), Value::Int(7));
        assert_eq!(Value::from("x"), Value::Str("x".into()));
    }

    #[test]
    fn test_code_accessors() {
        let value = Value::from(CodeValue::builder().name("f").build());
        assert_eq!(value.as_code().map(|c| c.name.as_str()), Some("f"));
        assert!(Value::None.as_code().is_none());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&Value::Tuple(vec![Value::None, Value::Int(3)])).unwrap();
        assert_eq!(json, r#"{"tuple":["none",{"int":3}]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Tuple(vec![Value::None, Value::Int(3)]));
    }
}
