//! Attribute values carried by graph nodes.

use crate::{Error, Result};

/// A node attribute value.
///
/// Attribute storage is opaque to the scheduler; passes read and write these
/// to record per-node facts (e.g. "already fused", target format).
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
    Strings(Vec<String>),
}

impl AttributeValue {
    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "int",
            AttributeValue::Float(_) => "float",
            AttributeValue::String(_) => "string",
            AttributeValue::Ints(_) => "ints",
            AttributeValue::Floats(_) => "floats",
            AttributeValue::Strings(_) => "strings",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl TryFrom<&AttributeValue> for bool {
    type Error = Error;

    fn try_from(value: &AttributeValue) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::Attribute(format!("expected bool, got {}", value.kind())))
    }
}

impl TryFrom<&AttributeValue> for i64 {
    type Error = Error;

    fn try_from(value: &AttributeValue) -> Result<Self> {
        value
            .as_int()
            .ok_or_else(|| Error::Attribute(format!("expected int, got {}", value.kind())))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}
