use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::CjlError;

/// Scalar metadata CloudWatch attaches to each delivered event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMeta {
    pub log_stream_name: Option<String>,
    /// Delivery timestamp, epoch milliseconds. Required by `normalize`.
    pub timestamp: Option<i64>,
    pub ingestion_time: Option<i64>,
    pub event_id: Option<String>,
}

/// One unit as it comes off the wire: service metadata plus a JSON-encoded
/// message body that has not been decoded yet.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEnvelope {
    pub message: String,
    pub source: SourceMeta,
}

/// A single value in a normalized event. Keeping timestamps as their own
/// variants (instead of preformatted strings) lets forced-order sorting
/// compare them and keeps display formatting in one place.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    LocalTime(NaiveDateTime),
    Json(Value),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            FieldValue::LocalTime(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => FieldValue::Str(s),
            Value::Number(n) if n.is_i64() => FieldValue::Int(n.as_i64().unwrap_or_default()),
            Value::Number(n) => FieldValue::Float(n.as_f64().unwrap_or_default()),
            Value::Bool(b) => FieldValue::Bool(b),
            other => FieldValue::Json(other),
        }
    }
}

/// The flattened, field-addressable record produced from one envelope.
/// Decoded message keys are stored as-is; metadata keys always carry the
/// `source.` prefix, so the two namespaces cannot collide.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NormalizedEvent(BTreeMap<String, FieldValue>);

impl NormalizedEvent {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.0.insert(field.into(), value);
    }

    /// The decoded message's own `timestamp`, if it was a parseable
    /// ISO-8601 string. This is the forced-order sort key.
    pub fn message_timestamp(&self) -> Option<DateTime<Utc>> {
        match self.0.get("timestamp") {
            Some(FieldValue::Time(t)) => Some(*t),
            _ => None,
        }
    }
}

/// Decode an envelope into a normalized event.
///
/// The message body must be a JSON object. A string `timestamp` inside it
/// is parsed as ISO-8601 and reinterpreted as UTC: the wall-clock value as
/// written is kept and UTC is attached, even if the input carried another
/// offset. Remaining envelope metadata is merged under `source.`, and
/// `source.timestamp_local` is derived from the required delivery
/// timestamp as a machine-local naive datetime.
pub fn normalize(envelope: RawEnvelope) -> Result<NormalizedEvent, CjlError> {
    let decoded: Value = serde_json::from_str(&envelope.message).map_err(|e| CjlError::Decode {
        preview: preview(&envelope.message),
        reason: e.to_string(),
    })?;
    let Value::Object(map) = decoded else {
        return Err(CjlError::Decode {
            preview: preview(&envelope.message),
            reason: "expected a JSON object".to_string(),
        });
    };

    let mut out = NormalizedEvent::default();
    for (key, value) in map {
        if key == "timestamp" && let Value::String(s) = &value {
            out.insert(key, FieldValue::Time(parse_iso_utc(s)?));
        } else {
            out.insert(key, value.into());
        }
    }

    let meta = envelope.source;
    let delivered = meta
        .timestamp
        .ok_or(CjlError::KeyMissing("source.timestamp"))?;
    if let Some(v) = meta.log_stream_name {
        out.insert("source.logStreamName", FieldValue::Str(v));
    }
    if let Some(v) = meta.ingestion_time {
        out.insert("source.ingestionTime", FieldValue::Int(v));
    }
    if let Some(v) = meta.event_id {
        out.insert("source.eventId", FieldValue::Str(v));
    }
    out.insert("source.timestamp", FieldValue::Int(delivered));
    out.insert(
        "source.timestamp_local",
        FieldValue::LocalTime(local_naive(delivered)?),
    );
    Ok(out)
}

/// Parse an ISO-8601 string and attach UTC to the wall-clock value as
/// written. `2020-01-01T09:00:00+05:00` becomes 09:00:00 UTC, not 04:00.
fn parse_iso_utc(s: &str) -> Result<DateTime<Utc>, CjlError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.naive_local().and_utc());
    }
    if let Ok(n) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(n.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN).and_utc());
    }
    Err(CjlError::BadTimestamp(s.to_string()))
}

fn local_naive(ms: i64) -> Result<NaiveDateTime, CjlError> {
    Local
        .timestamp_millis_opt(ms)
        .earliest()
        .map(|t| t.naive_local())
        .ok_or_else(|| CjlError::BadTimestamp(ms.to_string()))
}

fn preview(s: &str) -> String {
    let mut out: String = s.chars().take(80).collect();
    if s.chars().count() > 80 {
        out.push_str("...");
    }
    out
}
