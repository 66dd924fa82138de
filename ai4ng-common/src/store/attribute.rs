//! Typed attribute values as stored in key-value records
//!
//! Values serialize in the typed-JSON form used by the store's export
//! format, e.g. `{"N": "42"}` or `{"M": {"a0": {"N": "0.5"}}}`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One stored record: attribute name to typed value
///
/// `BTreeMap` keeps re-serialization deterministic.
pub type Item = BTreeMap<String, AttributeValue>;

/// Typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    #[serde(rename = "S")]
    S(String),
    /// Number, carried as its decimal text
    #[serde(rename = "N")]
    N(String),
    /// Boolean
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Explicit null marker
    #[serde(rename = "NULL")]
    Null(bool),
    /// Ordered list of values
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    /// Nested map
    #[serde(rename = "M")]
    M(BTreeMap<String, AttributeValue>),
    /// String set
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    /// Number set
    #[serde(rename = "NS")]
    Ns(Vec<String>),
}

impl AttributeValue {
    /// Build a string value
    pub fn s(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Build a number value from anything with a decimal text form
    pub fn n(value: impl ToString) -> Self {
        Self::N(value.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value of an `N` attribute
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::N(n) => n.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Short type tag (`"S"`, `"N"`, ...)
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
        }
    }

    /// Store equality: numbers compare by value (`"42"` equals `"42.0"`),
    /// everything else structurally. Values of different types never match.
    pub fn matches(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (Self::N(_), Self::N(_)) => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => self == other,
        }
    }

    /// Ordering used for sort keys; `None` when the two values are not
    /// comparable (different types, or unparsable numbers).
    pub fn key_cmp(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (Self::N(_), Self::N(_)) => self.as_number()?.partial_cmp(&other.as_number()?),
            (Self::S(a), Self::S(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::N(value.to_string())
    }
}
