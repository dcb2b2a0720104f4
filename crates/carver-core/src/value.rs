//! Leaf value classes and canonical encoding.
//!
//! Leaves fall into exactly two classes: booleans and everything else.
//! Numbers, strings, lists and null share the `string` class and are told
//! apart only by their canonical JSON text, so `1` and `"1"` never collide,
//! and neither do `true` and `"true"`.
//!
//! Scalars are encoded with their exact JSON text. Lists and sub-documents
//! go through RFC 8785 (JCS) for sorted keys, which reads numbers as IEEE
//! doubles, so an integer a double cannot hold is rejected there.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Coarse type class of a leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeClass {
    Bool,
    String,
}

impl TypeClass {
    /// Classify a leaf value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Bool,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors producing the canonical text of a leaf
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("JCS serialization failed: {0}")]
    Canonical(String),

    #[error("canonical form is not UTF-8: {0}")]
    Utf8(String),

    #[error("JSON serialization failed: {0}")]
    Json(String),

    #[error("integer {0} inside a list or document has no exact canonical form")]
    Unrepresentable(String),
}

/// A leaf value's class plus its canonical serialized form.
///
/// Two leaves are equal iff both parts match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EncodedLeaf {
    class: TypeClass,
    text: String,
}

impl EncodedLeaf {
    /// Encode a leaf: exact JSON text for scalars, JCS for lists and documents
    pub fn encode(value: &Value) -> Result<Self, EncodeError> {
        let text = match value {
            Value::Array(_) | Value::Object(_) => canonical_text(value)?,
            scalar => {
                serde_json::to_string(scalar).map_err(|e| EncodeError::Json(e.to_string()))?
            }
        };

        Ok(Self {
            class: TypeClass::of(value),
            text,
        })
    }

    pub fn class(&self) -> TypeClass {
        self.class
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

fn canonical_text(value: &Value) -> Result<String, EncodeError> {
    if let Some(number) = first_inexact_number(value) {
        return Err(EncodeError::Unrepresentable(number.to_string()));
    }
    let bytes = serde_json_canonicalizer::to_vec(value)
        .map_err(|e| EncodeError::Canonical(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| EncodeError::Utf8(e.to_string()))
}

fn first_inexact_number(value: &Value) -> Option<&Number> {
    match value {
        Value::Number(n) if !fits_f64(n) => Some(n),
        Value::Array(items) => items.iter().find_map(first_inexact_number),
        Value::Object(map) => map.values().find_map(first_inexact_number),
        _ => None,
    }
}

/// Whether the number survives a round trip through `f64`
fn fits_f64(n: &Number) -> bool {
    if let Some(i) = n.as_i64() {
        (i as f64) as i128 == i as i128
    } else if let Some(u) = n.as_u64() {
        (u as f64) as i128 == u as i128
    } else {
        true
    }
}
