//! Schema capability: projects untyped payloads onto declared field sets.

use crate::{validation_errors_to_dao_error, DaoError, DaoResult, FieldMap};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

/// A declared field set that payload fragments are projected through.
///
/// Projection keeps only the declared keys, so unknown or unsafe fields never
/// reach storage. The projected map is then checked by deserializing it into
/// the schema type and running its `validator` rules.
pub trait Schema: DeserializeOwned + Validate {
    /// Human-readable schema name used in error messages.
    const NAME: &'static str;

    /// Keys this schema declares.
    const FIELDS: &'static [&'static str];

    /// Projects `payload`, or the sub-mapping under `nested_key`, onto this
    /// schema.
    ///
    /// Returns `Ok(None)` when the nested key is missing, is not a mapping,
    /// or nothing survives projection.
    fn project(payload: &FieldMap, nested_key: Option<&str>) -> DaoResult<Option<FieldMap>> {
        let source = match nested_key {
            Some(key) => match payload.get(key) {
                Some(Value::Object(nested)) => nested,
                _ => return Ok(None),
            },
            None => payload,
        };

        let projected: FieldMap = source
            .iter()
            .filter(|(key, _)| Self::FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if projected.is_empty() {
            return Ok(None);
        }

        Self::check(&projected)?;
        Ok(Some(projected))
    }

    /// Validates an already projected map against this schema.
    fn check(projected: &FieldMap) -> DaoResult<()> {
        let typed: Self = serde_json::from_value(Value::Object(projected.clone()))
            .map_err(|e| DaoError::validation(format!("{}: {}", Self::NAME, e)))?;
        typed.validate().map_err(validation_errors_to_dao_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    struct Contact {
        #[validate(email)]
        email: Option<String>,
        #[allow(dead_code)]
        phone: Option<String>,
    }

    impl Schema for Contact {
        const NAME: &'static str = "Contact";
        const FIELDS: &'static [&'static str] = &["email", "phone"];
    }

    fn payload(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_project_keeps_declared_keys_only() {
        let data = payload(json!({ "email": "a@b.com", "is_admin": true }));
        let projected = Contact::project(&data, None).unwrap().unwrap();
        assert_eq!(projected, payload(json!({ "email": "a@b.com" })));
    }

    #[test]
    fn test_project_nested_missing_is_none() {
        let data = payload(json!({ "email": "a@b.com" }));
        assert!(Contact::project(&data, Some("contact")).unwrap().is_none());
    }

    #[test]
    fn test_project_nested_without_declared_keys_is_none() {
        let data = payload(json!({ "contact": { "fax": "123" } }));
        assert!(Contact::project(&data, Some("contact")).unwrap().is_none());
    }

    #[test]
    fn test_project_nested() {
        let data = payload(json!({ "contact": { "phone": "555" } }));
        let projected = Contact::project(&data, Some("contact")).unwrap().unwrap();
        assert_eq!(projected.get("phone"), Some(&json!("555")));
    }

    #[test]
    fn test_project_rejects_invalid_values() {
        let data = payload(json!({ "email": "not-an-email" }));
        let err = Contact::project(&data, None).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_project_rejects_wrong_types() {
        let data = payload(json!({ "phone": 12 }));
        assert!(Contact::project(&data, None).unwrap_err().is_validation());
    }
}
