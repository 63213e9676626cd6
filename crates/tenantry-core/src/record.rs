//! Capability contract shared by every persisted record type.

use crate::{DaoError, DaoResult, RecordKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Untyped string-keyed mapping used for payloads, filters, and rows.
pub type FieldMap = serde_json::Map<String, Value>;

/// A persisted entity with a declared primary key and a fixed column set.
///
/// Implemented once per concrete record type; the generic store and the
/// session backends work purely through this contract.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage table name.
    const TABLE: &'static str;

    /// Owner discriminant written into polymorphic association rows.
    const ENTITY_TYPE: &'static str;

    /// Name of the primary-key column.
    const PRIMARY_KEY: &'static str;

    /// Every persisted column. Fields outside this list are never stored.
    const FIELDS: &'static [&'static str];

    /// Primary-key value of this record.
    fn key(&self) -> RecordKey;

    /// Hook run after [`Record::apply`] changed at least one field.
    fn touch(&mut self) {}

    /// Returns true if `field` is a persisted column of this type.
    #[must_use]
    fn declares(field: &str) -> bool {
        Self::FIELDS.contains(&field)
    }

    /// Instantiates the record from a field map. Missing columns fall back to
    /// the record's serde defaults (generated ids, timestamps).
    fn from_fields(fields: FieldMap) -> DaoResult<Self> {
        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            DaoError::validation(format!("Invalid {} fields: {}", Self::ENTITY_TYPE, e))
        })
    }

    /// Returns the persisted columns as a row, dropping non-column slots.
    fn to_fields(&self) -> DaoResult<FieldMap> {
        match serde_json::to_value(self)? {
            Value::Object(mut map) => {
                map.retain(|k, _| Self::declares(k));
                Ok(map)
            }
            other => Err(DaoError::Other(anyhow::anyhow!(
                "{} serialized to a non-object value: {}",
                Self::ENTITY_TYPE,
                other
            ))),
        }
    }

    /// Lenient field-by-field merge.
    ///
    /// Only declared columns are written; unknown names and the primary key
    /// are ignored. Returns the number of fields whose value changed.
    fn apply(&mut self, fields: &FieldMap) -> DaoResult<usize> {
        let mut row = self.to_fields()?;
        let mut changed = 0;
        for (field, value) in fields {
            if field == Self::PRIMARY_KEY || !Self::declares(field) {
                continue;
            }
            if row.get(field) != Some(value) {
                row.insert(field.clone(), value.clone());
                changed += 1;
            }
        }
        if changed == 0 {
            return Ok(0);
        }

        let mut updated = Self::from_fields(row)?;
        updated.carry_relations(self);
        *self = updated;
        self.touch();
        Ok(changed)
    }

    /// Moves non-column state (eagerly loaded relations) from `previous`
    /// into a freshly rebuilt record.
    fn carry_relations(&mut self, _previous: &mut Self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        note_id: i64,
        title: String,
        #[serde(default)]
        body: Option<String>,
        #[serde(skip)]
        edits: u32,
    }

    impl Record for Note {
        const TABLE: &'static str = "notes";
        const ENTITY_TYPE: &'static str = "Note";
        const PRIMARY_KEY: &'static str = "note_id";
        const FIELDS: &'static [&'static str] = &["note_id", "title", "body"];

        fn key(&self) -> RecordKey {
            RecordKey::Int(self.note_id)
        }

        fn touch(&mut self) {
            self.edits += 1;
        }

        fn carry_relations(&mut self, previous: &mut Self) {
            self.edits = previous.edits;
        }
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_fields_uses_defaults() {
        let note = Note::from_fields(fields(json!({ "note_id": 1, "title": "a" }))).unwrap();
        assert_eq!(note.body, None);
        assert_eq!(note.key(), RecordKey::Int(1));
    }

    #[test]
    fn test_from_fields_rejects_wrong_types() {
        let err = Note::from_fields(fields(json!({ "note_id": "x", "title": "a" }))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_apply_ignores_unknown_fields_and_primary_key() {
        let mut note = Note::from_fields(fields(json!({ "note_id": 1, "title": "a" }))).unwrap();
        let before = note.clone();

        let changed = note
            .apply(&fields(json!({ "note_id": 9, "colour": "red" })))
            .unwrap();

        assert_eq!(changed, 0);
        assert_eq!(note, before);
    }

    #[test]
    fn test_apply_overwrites_declared_fields() {
        let mut note = Note::from_fields(fields(json!({ "note_id": 1, "title": "a" }))).unwrap();

        let changed = note.apply(&fields(json!({ "title": "b", "body": "text" }))).unwrap();

        assert_eq!(changed, 2);
        assert_eq!(note.title, "b");
        assert_eq!(note.body.as_deref(), Some("text"));
        assert_eq!(note.edits, 1);
    }

    #[test]
    fn test_to_fields_drops_non_columns() {
        let note = Note::from_fields(fields(json!({ "note_id": 1, "title": "a" }))).unwrap();
        let row = note.to_fields().unwrap();
        assert_eq!(row.len(), 3);
        assert!(!row.contains_key("edits"));
    }
}
