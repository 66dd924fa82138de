//! Classifier domain values returned to API consumers
//!
//! All values are request-scoped projections of stored records; nothing in
//! this module is persisted by the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a classifier
///
/// Only fitted classifiers are stored, so every record reports `Ready`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierStatus {
    #[default]
    Ready,
}

/// One offline model-fitting run for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classifier {
    pub classifier_id: i64,
    pub session_id: i64,
    pub session_name: String,
    pub status: ClassifierStatus,
    pub upload_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub peak_accuracy: f64,
    pub error_margin: f64,
    /// Owning user; used for scoping, never serialized
    #[serde(skip)]
    pub user_id: String,
    /// `None` when the record carries no parameter fragment at all
    pub parameters: Option<Parameters>,
    pub graphs: Option<Vec<Graph>>,
}

/// Fitted model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// Bias term
    pub a0: f64,
    /// Coefficient vector, in stored order
    pub a1: Vec<f64>,
    /// Source fragment as stored, for fields not modelled here
    pub full_cf_json: String,
}

/// Diagnostic artifact
///
/// `data` is the storage path when attached to a classifier and the base64
/// payload when fetched through a graph endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub name: String,
    pub data: String,
}

/// Decoded JSON payload of a data artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    pub name: String,
    pub data: serde_json::Value,
}

/// Session reference as supplied by a caller
///
/// Sessions are addressed by numeric id or by human-readable name. Text that
/// parses as an integer is always taken as an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    Numeric(i64),
    Name(String),
}

impl SessionRef {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => SessionRef::Numeric(id),
            Err(_) => SessionRef::Name(trimmed.to_string()),
        }
    }

    /// Textual form used as a string-typed key
    pub fn as_key(&self) -> String {
        match self {
            SessionRef::Numeric(id) => id.to_string(),
            SessionRef::Name(name) => name.clone(),
        }
    }
}

impl std::fmt::Display for SessionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classifier_serializes_camel_case_without_user() {
        let ts = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let classifier = Classifier {
            classifier_id: 7,
            session_id: 42,
            session_name: "42".to_string(),
            status: ClassifierStatus::Ready,
            upload_date: ts,
            last_updated: ts,
            peak_accuracy: 0.0,
            error_margin: 0.0,
            user_id: "u1".to_string(),
            parameters: Some(Parameters {
                a0: 0.5,
                a1: vec![0.1, 0.2],
                full_cf_json: "{}".to_string(),
            }),
            graphs: None,
        };

        let value = serde_json::to_value(&classifier).unwrap();
        assert_eq!(value["classifierId"], 7);
        assert_eq!(value["sessionId"], 42);
        assert_eq!(value["status"], "Ready");
        assert_eq!(value["uploadDate"], "2023-11-14T22:13:20Z");
        assert_eq!(value["parameters"]["a1"], json!([0.1, 0.2]));
        assert_eq!(value["parameters"]["fullCfJson"], "{}");
        assert!(value.get("userId").is_none());
        assert!(value["graphs"].is_null());
    }

    #[test]
    fn test_session_ref_parse() {
        assert_eq!(SessionRef::parse("42"), SessionRef::Numeric(42));
        assert_eq!(SessionRef::parse(" 42 "), SessionRef::Numeric(42));
        assert_eq!(SessionRef::parse("-1"), SessionRef::Numeric(-1));
        assert_eq!(
            SessionRef::parse("Morning calibration"),
            SessionRef::Name("Morning calibration".to_string())
        );
        assert_eq!(SessionRef::parse("42a").as_key(), "42a");
    }
}
