//! Stored record to [`Classifier`] mapping
//!
//! Decoding never fails on a malformed field: unreadable numbers become 0,
//! unreadable names become `"Unknown"`, unreadable timestamps become now.
//! Only a record with no identity at all is rejected, and rejecting one
//! record never affects another.

use crate::accessors::{field, item_integer, item_number, item_string, read_number, read_number_list};
use crate::models::{Classifier, ClassifierStatus, Parameters};
use ai4ng_common::store::{AttributeValue, Item};
use ai4ng_common::time::{from_epoch_millis, now};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Stored attribute names
pub mod attr {
    pub const CLASSIFIER_ID: &str = "classifierId";
    pub const SESSION_ID: &str = "sessionId";
    pub const SESSION_NAME: &str = "sessionName";
    pub const USER_ID: &str = "userId";
    pub const TIMESTAMP: &str = "timestamp";
    pub const LAST_UPDATED: &str = "lastUpdated";
    pub const PEAK_ACCURACY: &str = "peakAccuracy";
    pub const ERROR_MARGIN: &str = "errorMargin";
    pub const CF: &str = "cf";
}

const UNKNOWN_SESSION: &str = "Unknown";

/// Why a record could not be turned into a [`Classifier`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record is empty")]
    EmptyRecord,

    #[error("record has no readable classifierId, sessionId or sessionName")]
    MissingIdentity,
}

/// Decode one stored record
pub fn decode(item: &Item) -> Result<Classifier, DecodeError> {
    if item.is_empty() {
        return Err(DecodeError::EmptyRecord);
    }

    let raw_classifier_id = item_integer(item, attr::CLASSIFIER_ID);
    let raw_session_id = item_integer(item, attr::SESSION_ID);
    let session_name =
        item_string(item, attr::SESSION_NAME).or_else(|| item_string(item, attr::SESSION_ID));

    if raw_classifier_id.is_none() && raw_session_id.is_none() && session_name.is_none() {
        return Err(DecodeError::MissingIdentity);
    }

    // Records written before classifier ids existed are keyed by session only
    let classifier_id = non_negative(raw_classifier_id.or(raw_session_id));
    let session_id = non_negative(raw_session_id);

    let upload_date = epoch_millis(item, attr::TIMESTAMP).unwrap_or_else(now);
    let last_updated = epoch_millis(item, attr::LAST_UPDATED).unwrap_or(upload_date);

    Ok(Classifier {
        classifier_id,
        session_id,
        session_name: session_name.unwrap_or_else(|| UNKNOWN_SESSION.to_string()),
        status: ClassifierStatus::Ready,
        upload_date,
        last_updated,
        peak_accuracy: item_number(item, attr::PEAK_ACCURACY).unwrap_or(0.0),
        error_margin: item_number(item, attr::ERROR_MARGIN).unwrap_or(0.0),
        user_id: item_string(item, attr::USER_ID).unwrap_or_default(),
        parameters: extract_parameters(item),
        graphs: None,
    })
}

/// Decode a batch, dropping (and logging) records that cannot be decoded
pub fn decode_batch(items: &[Item]) -> Vec<Classifier> {
    items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| match decode(item) {
            Ok(classifier) => Some(classifier),
            Err(e) => {
                warn!(position, error = %e, "Skipping undecodable classifier record");
                None
            }
        })
        .collect()
}

fn non_negative(value: Option<i64>) -> i64 {
    value.filter(|v| *v >= 0).unwrap_or(0)
}

fn epoch_millis(item: &Item, attribute: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    item_number(item, attribute).and_then(|ms| from_epoch_millis(ms as i64))
}

/// Extract model parameters from the `cf` fragment
///
/// Absent (or explicitly null) fragment yields `None`. A present fragment
/// always yields `Some`, with whatever could be read and the fragment kept
/// verbatim in `full_cf_json`.
fn extract_parameters(item: &Item) -> Option<Parameters> {
    let cf = item.get(attr::CF).filter(|cf| !cf.is_null())?;

    let (full_cf_json, view) = match cf {
        AttributeValue::S(text) => (text.clone(), parse_fragment(text)),
        AttributeValue::M(map) => {
            let view = serde_json::to_value(map).ok();
            let raw = view.as_ref().map(Value::to_string).unwrap_or_default();
            (raw, view)
        }
        other => {
            let view = serde_json::to_value(other).ok();
            let raw = view.as_ref().map(Value::to_string).unwrap_or_default();
            (raw, view)
        }
    };

    let Some(view) = view else {
        warn!("Parameter fragment is not JSON, keeping it verbatim only");
        return Some(Parameters {
            a0: 0.0,
            a1: Vec::new(),
            full_cf_json,
        });
    };

    let param = field(&view, "param");
    if param.is_none() {
        warn!("Parameter fragment has no param section");
    }

    let a0 = param
        .and_then(|p| field(p, "a0"))
        .and_then(read_number)
        .unwrap_or(0.0);
    let a1 = param
        .and_then(|p| field(p, "a1N").or_else(|| field(p, "a1")))
        .and_then(read_number_list)
        .unwrap_or_default();

    Some(Parameters {
        a0,
        a1,
        full_cf_json,
    })
}

/// Parse a JSON-encoded fragment, unwrapping one level of double encoding
fn parse_fragment(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::String(inner) => serde_json::from_str(&inner).ok(),
        value => Some(value),
    }
}
