//! Primary-key values for persisted records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};
use uuid::Uuid;

/// A comparable scalar primary-key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// UUID key (stored as its hyphenated string form).
    Uuid(Uuid),
    /// Integer key.
    Int(i64),
    /// Any other textual key.
    Text(String),
}

impl RecordKey {
    /// Converts a row value into a key, preferring the UUID form for strings
    /// that parse as one.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(
                Uuid::parse_str(s).map_or_else(|_| Self::Text(s.clone()), Self::Uuid),
            ),
            Value::Number(n) => n.as_i64().map(Self::Int),
            _ => None,
        }
    }

    /// Returns the value stored in a row for this key.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Uuid(id) => Value::String(id.to_string()),
            Self::Int(id) => Value::from(*id),
            Self::Text(id) => Value::String(id.clone()),
        }
    }

    /// Returns the UUID if this is a UUID key.
    #[must_use]
    pub const fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns true for keys that carry no identity (nil UUID, empty text).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Uuid(id) => id.is_nil(),
            Self::Int(_) => false,
            Self::Text(id) => id.is_empty(),
        }
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(id) => write!(f, "{id}"),
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<Uuid> for RecordKey {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<i64> for RecordKey {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RecordKey {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<RecordKey> for Value {
    fn from(key: RecordKey) -> Self {
        key.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_strings_become_uuid_keys() {
        let id = Uuid::now_v7();
        let key = RecordKey::from_value(&Value::String(id.to_string())).unwrap();
        assert_eq!(key, RecordKey::Uuid(id));
        assert_eq!(key.to_value(), Value::String(id.to_string()));
        assert_eq!(key.as_uuid(), Some(id));
    }

    #[test]
    fn test_uuid_spellings_share_one_canonical_value() {
        let id = Uuid::now_v7();
        let upper = RecordKey::from_value(&Value::String(id.to_string().to_uppercase())).unwrap();
        let simple = RecordKey::from_value(&Value::String(id.simple().to_string())).unwrap();

        assert_eq!(upper.to_value(), Value::String(id.to_string()));
        assert_eq!(simple, RecordKey::Uuid(id));
        assert_eq!(RecordKey::Int(7).as_uuid(), None);
    }

    #[test]
    fn test_integer_and_text_keys() {
        assert_eq!(RecordKey::from_value(&Value::from(42)), Some(RecordKey::Int(42)));
        assert_eq!(
            RecordKey::from_value(&Value::from("admin")),
            Some(RecordKey::Text("admin".to_string()))
        );
        assert_eq!(RecordKey::from_value(&Value::Null), None);
    }

    #[test]
    fn test_empty_keys() {
        assert!(RecordKey::Uuid(Uuid::nil()).is_empty());
        assert!(RecordKey::from("").is_empty());
        assert!(!RecordKey::from(0).is_empty());
    }
}
