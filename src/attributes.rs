//! Typed worker attribute blobs.
//!
//! The registry stores worker attributes as a JSON document serialized into a
//! string. This module parses that string into an ordered mapping of
//! [`AttributeValue`]s and serializes it back, preserving key order so an
//! update only changes the keys a mutation plan touches.
//!
//! # Example
//!
//! ```
//! use sweeper::attributes::{AttributeValue, Attributes};
//!
//! let mut attrs = Attributes::parse(r#"{"email":"a@example.com","skills":{"lang":"en"}}"#).unwrap();
//! attrs.insert("status", AttributeValue::from("archived"));
//! assert_eq!(
//!     attrs.to_json().unwrap(),
//!     r#"{"email":"a@example.com","skills":{"lang":"en"},"status":"archived"}"#
//! );
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Errors raised while parsing or serializing an attribute blob.
#[derive(Debug, thiserror::Error)]
pub enum AttributeError {
    #[error("attributes are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("attributes must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<AttributeValue>),
    Map(Attributes),
}

impl AttributeValue {
    /// JavaScript-style truthiness.
    ///
    /// `null`, `false`, `0`, `NaN` and the empty string are falsy. Lists and
    /// mappings are truthy even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::List(_) | Self::Map(_) => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "array",
            Self::Map(_) => "object",
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Map(m) => m.to_value(),
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(Attributes(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            )),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::Number(Number::from(n))
    }
}

/// Renders the value the way it appears in a CSV cell.
///
/// Strings are written verbatim, `null` is empty, and lists/mappings are
/// compact JSON.
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => match n.as_f64() {
                Some(v) if n.is_f64() && v.fract() == 0.0 && v.abs() < 1e15 => {
                    write!(f, "{}", v as i64)
                }
                _ => write!(f, "{n}"),
            },
            Self::String(s) => f.write_str(s),
            Self::List(_) | Self::Map(_) => write!(f, "{}", self.to_value()),
        }
    }
}

/// An ordered attribute mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(IndexMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry attribute blob.
    ///
    /// A blank blob is treated as an empty mapping. Anything else must be a
    /// JSON object.
    pub fn parse(raw: &str) -> Result<Self, AttributeError> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        match AttributeValue::from(serde_json::from_str::<Value>(raw)?) {
            AttributeValue::Map(m) => Ok(m),
            other => Err(AttributeError::NotAnObject(other.kind())),
        }
    }

    /// Serialize back into the registry's string form.
    pub fn to_json(&self) -> Result<String, AttributeError> {
        Ok(serde_json::to_string(&self.to_value())?)
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.0.insert(key.into(), value);
    }

    /// Remove a key, keeping the relative order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
