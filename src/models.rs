use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::window::Snapshot;

/// Body of `POST /transactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    /// Parsed from the JSON number text, so no binary float is involved.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    /// RFC 3339 string, zone-less ISO string (read as UTC), or epoch
    /// milliseconds as a number or a string of digits.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Body of `GET /statistics`. Extrema are omitted while the window is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsResponse {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub sum: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub avg: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::arbitrary_precision_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<Decimal>,
    pub count: u64,
}

impl From<&Snapshot> for StatisticsResponse {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            sum: snapshot.sum,
            avg: snapshot.avg,
            max: snapshot.max,
            min: snapshot.min,
            count: snapshot.count,
        }
    }
}

// Goes through `serde_json::Value` so integer timestamps survive the
// arbitrary_precision number representation.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(raw) => parse_timestamp(&raw).map_err(de::Error::custom),
        serde_json::Value::Number(raw) => raw
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| {
                de::Error::custom(format!("invalid epoch-millisecond timestamp {}", raw))
            }),
        other => Err(de::Error::custom(format!(
            "timestamp must be an ISO 8601 string or epoch milliseconds, got {}",
            other
        ))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| format!("invalid epoch-millisecond timestamp {:?}", raw));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("invalid ISO 8601 timestamp {:?}: {}", raw, e))
}
