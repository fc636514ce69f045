//! Timestamp parsing for wire payloads.
//!
//! The backend emits naive ISO-8601 strings in UTC (`2024-05-01T09:30:00.123456`),
//! other producers send RFC 3339 with an offset. Both are accepted.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for `Option<DateTime<Utc>>` fields.
///
/// Unparseable values deserialize to `None` instead of failing the whole frame.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&super::format(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(|s| {
            let parsed = super::parse(s);
            if parsed.is_none() {
                tracing::debug!("Ignoring unparseable timestamp: {}", s);
            }
            parsed
        }))
    }
}
