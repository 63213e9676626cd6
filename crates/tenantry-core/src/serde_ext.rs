//! Serde adapters that keep record rows identical across storage backends.
//!
//! MySQL renders `DATETIME(6)` as `YYYY-MM-DD hh:mm:ss.ffffff` and `BOOLEAN`
//! as `0/1` inside `JSON_OBJECT`; these adapters write the former and accept
//! both forms when reading.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};

const SQL_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn parse_timestamp<E: de::Error>(raw: &str) -> Result<DateTime<Utc>, E> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| E::custom(format!("invalid timestamp '{raw}': {e}")))
}

/// `DateTime<Utc>` as SQL timestamp text.
pub mod timestamp {
    use super::*;

    /// Current time at the microsecond precision storage keeps.
    #[must_use]
    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(SQL_TIMESTAMP).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
    }
}

/// `Option<DateTime<Utc>>` as SQL timestamp text or null.
pub mod timestamp_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(SQL_TIMESTAMP).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse_timestamp(&raw))
            .transpose()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolRepr {
    Bool(bool),
    Int(i64),
}

/// Reads a boolean from `true/false` or `0/1`.
pub fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match BoolRepr::deserialize(deserializer)? {
        BoolRepr::Bool(value) => Ok(value),
        BoolRepr::Int(0) => Ok(false),
        BoolRepr::Int(1) => Ok(true),
        BoolRepr::Int(other) => Err(de::Error::custom(format!("invalid boolean value {other}"))),
    }
}

/// Reads an optional boolean from `true/false`, `0/1`, or null.
pub fn flexible_bool_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    match Option::<BoolRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolRepr::Bool(value)) => Ok(Some(value)),
        Some(BoolRepr::Int(0)) => Ok(Some(false)),
        Some(BoolRepr::Int(1)) => Ok(Some(true)),
        Some(BoolRepr::Int(other)) => Err(de::Error::custom(format!("invalid boolean value {other}"))),
    }
}
