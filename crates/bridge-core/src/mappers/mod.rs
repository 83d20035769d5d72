//! Built-in mappers for the supported test management systems.

pub mod qtest;
pub mod zephyr;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::mapper::{MapperError, Result};

/// View a payload as a JSON object or fail with a mapper error.
pub(crate) fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| MapperError::NotAnObject(what.to_string()))
}

/// First present key, rendered as a string. Numbers and booleans are
/// stringified; null and missing keys yield `None`.
pub(crate) fn string_of(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            Some(Value::Bool(b)) => return Some(b.to_string()),
            _ => {}
        }
    }
    None
}

pub(crate) fn string_or_empty(map: &Map<String, Value>, keys: &[&str]) -> String {
    string_of(map, keys).unwrap_or_default()
}

/// First present key as a non-empty string.
pub(crate) fn non_empty_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    string_of(map, keys).filter(|s| !s.is_empty())
}

pub(crate) fn u64_of(map: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    for key in keys {
        if let Some(n) = map.get(*key).and_then(Value::as_u64) {
            return Some(n);
        }
    }
    None
}

pub(crate) fn f64_of(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(n) = map.get(*key).and_then(Value::as_f64) {
            return Some(n);
        }
    }
    None
}

pub(crate) fn array_of<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Vec<Value>> {
    for key in keys {
        if let Some(arr) = map.get(*key).and_then(Value::as_array) {
            return Some(arr);
        }
    }
    None
}

/// Render an instant the way Zephyr Scale does: ISO-8601 UTC with
/// second precision, e.g. `2025-01-01T08:00:00Z`.
pub(crate) fn iso_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a timestamp that is either an ISO-8601 string or a millisecond
/// epoch number. Absent keys yield `Ok(None)`; present but unparseable
/// values are a mapper error.
pub(crate) fn datetime_of(
    map: &Map<String, Value>,
    keys: &[&str],
) -> Result<Option<DateTime<Utc>>> {
    for key in keys {
        match map.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => {
                let parsed = DateTime::parse_from_rfc3339(s).map_err(|_| {
                    MapperError::InvalidTimestamp {
                        field: (*key).to_string(),
                        value: s.clone(),
                    }
                })?;
                return Ok(Some(parsed.with_timezone(&Utc)));
            }
            Some(Value::Number(n)) => {
                let millis = n.as_i64().ok_or_else(|| MapperError::InvalidTimestamp {
                    field: (*key).to_string(),
                    value: n.to_string(),
                })?;
                let parsed = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                    MapperError::InvalidTimestamp {
                        field: (*key).to_string(),
                        value: millis.to_string(),
                    }
                })?;
                return Ok(Some(parsed));
            }
            _ => {}
        }
    }
    Ok(None)
}
