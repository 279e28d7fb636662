//! Stored Values and Their Byte Encoding
//!
//! Spaces hold arbitrary application values. Rather than sharing structure
//! with the caller, every value crosses the storage boundary through an
//! explicit codec:
//!
//! ```text
//!   Value::Undefined            ──encode──>  {"kind":"undefined"}
//!   Value::Json(json!(false))   ──encode──>  {"kind":"json","data":false}
//! ```
//!
//! `Undefined` is a real stored value, distinct from JSON `null` and from
//! "no entry at all" (which callers see as `None`).

use crate::error::Result;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value held in a space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Explicitly stored "no value"
    #[default]
    Undefined,
    /// Any JSON-representable value, including `null`, `false`, `0` and `""`
    Json(serde_json::Value),
}

impl Value {
    /// Serializes an arbitrary serde value into a `Value`.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Deserializes this value into `T`.
    ///
    /// `Undefined` deserializes as JSON `null`, so it maps onto `Option::None`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let json = match self {
            Self::Undefined => serde_json::Value::Null,
            Self::Json(json) => json.clone(),
        };
        Ok(serde_json::from_value(json)?)
    }

    /// Encodes the value into its stored byte form.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decodes a value previously produced by [`Value::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns the string content, if this is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(json) => json.as_str(),
            Self::Undefined => None,
        }
    }

    /// Returns the JSON payload, if any.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(json) => Some(json),
            Self::Undefined => None,
        }
    }

    /// Interprets the value as an epoch-millisecond timestamp.
    ///
    /// Accepts integer and float numbers and numeric strings. Anything else
    /// is not a timestamp: booleans, empty strings and `null` are never
    /// coerced to a number, so such a marker never expires. A `0` marker is
    /// an ordinary instant and is already due.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self.as_json()? {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
            _ => None,
        }
    }

    /// Converts the value into plain JSON for display. `Undefined` becomes `null`.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Undefined => serde_json::Value::Null,
            Self::Json(json) => json,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::Json(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Json(serde_json::Value::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Json(serde_json::Value::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Json(serde_json::Value::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Json(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Json(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Json(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `null`.
    fn from(n: f64) -> Self {
        Self::Json(
            serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        )
    }
}
