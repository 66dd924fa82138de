//! Schema-tolerant field accessors
//!
//! Writers of classifier records disagree on physical encoding: a number may
//! be a native JSON number, a numeric string, a typed wrapper such as
//! `{"N": "42"}`, or a wrapper nested in another wrapper (`{"M": {"N": ...}}`).
//! Every decode in this crate reads fields through these functions, so all
//! encodings of the same logical value read identically.

use ai4ng_common::store::Item;
use serde_json::Value;

/// Single-key wrapper maps that carry no meaning of their own
const WRAPPER_TAGS: &[&str] = &["S", "N", "M", "L", "SS", "NS", "BOOL", "value"];

/// Strip typed-value wrappers until a bare value remains
pub fn peel(mut value: &Value) -> &Value {
    loop {
        match value {
            Value::Object(map) if map.len() == 1 => {
                let Some((tag, inner)) = map.iter().next() else {
                    return value;
                };
                if !WRAPPER_TAGS.contains(&tag.as_str()) {
                    return value;
                }
                value = inner;
            }
            _ => return value,
        }
    }
}

/// Named field of a (possibly wrapped) map
pub fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    peel(value).get(name)
}

/// Finite number from a native number or numeric string
pub fn read_number(value: &Value) -> Option<f64> {
    let number = match peel(value) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Integer from a native number or numeric string
///
/// Integral floats (`42.0`) are accepted; fractional values are not.
pub fn read_integer(value: &Value) -> Option<i64> {
    match peel(value) {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    let in_range = v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64;
    in_range.then_some(v as i64)
}

/// Non-empty text; numbers are rendered in their JSON form
pub fn read_string(value: &Value) -> Option<String> {
    match peel(value) {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ordered list of numbers
///
/// Accepts a list (elements in any numeric encoding) or a string holding a
/// JSON list. Elements that cannot be read are skipped; order is preserved.
pub fn read_number_list(value: &Value) -> Option<Vec<f64>> {
    match peel(value) {
        Value::Array(items) => Some(items.iter().filter_map(read_number).collect()),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Array(_)) => read_number_list(&parsed),
            _ => None,
        },
        _ => None,
    }
}

/// JSON view of one stored attribute (typed form, e.g. `{"N": "42"}`)
pub fn item_value(item: &Item, attribute: &str) -> Option<Value> {
    item.get(attribute)
        .and_then(|v| serde_json::to_value(v).ok())
}

/// Tolerant numeric read of a stored attribute
pub fn item_number(item: &Item, attribute: &str) -> Option<f64> {
    item_value(item, attribute).as_ref().and_then(read_number)
}

/// Tolerant integer read of a stored attribute
pub fn item_integer(item: &Item, attribute: &str) -> Option<i64> {
    item_value(item, attribute).as_ref().and_then(read_integer)
}

/// Tolerant text read of a stored attribute
pub fn item_string(item: &Item, attribute: &str) -> Option<String> {
    item_value(item, attribute).as_ref().and_then(read_string)
}
