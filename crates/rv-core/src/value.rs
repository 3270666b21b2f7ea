//! Scalar grouping keys decoded from loosely typed JSON.
//!
//! Search hits carry grouping fields (`training_run_id`, `level`,
//! `user_ref_id`, ...) as untyped JSON. They are decoded into [`GroupKey`]
//! exactly once, at the response boundary; everything downstream works
//! with the tagged value.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// A scalar grouping key: either an integer identifier or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Int(i64),
    Str(String),
}

/// Raised when a grouping field holds something other than a scalar.
#[derive(Debug, Error, PartialEq)]
#[error("expected a scalar grouping key, got `{0}`")]
pub struct NonScalarKey(pub String);

impl GroupKey {
    /// Decode a JSON value into a key. Integers stay integers; strings
    /// stay strings; booleans, floats, arrays, objects and null are
    /// rejected.
    pub fn from_json(value: &Value) -> Result<Self, NonScalarKey> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(GroupKey::Int)
                .ok_or_else(|| NonScalarKey(value.to_string())),
            Value::String(s) => Ok(GroupKey::Str(s.clone())),
            other => Err(NonScalarKey(other.to_string())),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GroupKey::Int(n) => Some(*n),
            GroupKey::Str(_) => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Int(n) => write!(f, "{}", n),
            GroupKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for GroupKey {
    fn from(n: i64) -> Self {
        GroupKey::Int(n)
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        GroupKey::Str(s.to_string())
    }
}

// Serializes as the inner scalar; as a map key this becomes the decimal
// string for integers (serde_json handles that conversion).
impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupKey::Int(n) => serializer.serialize_i64(*n),
            GroupKey::Str(s) => serializer.serialize_str(s),
        }
    }
}
