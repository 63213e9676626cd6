//! Field sets for the user aggregate's base record and info aspects.

use crate::Schema;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use validator::Validate;

/// Base profile columns written when the user row itself is created.
#[derive(Debug, Deserialize, Validate)]
pub struct UserBase {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub middle_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(custom(function = "crate::validation::rules::phone_number"))]
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(url)]
    pub photo_url: Option<String>,
}

impl Schema for UserBase {
    const NAME: &'static str = "UserBase";
    const FIELDS: &'static [&'static str] = &[
        "email",
        "first_name",
        "middle_name",
        "last_name",
        "phone_number",
        "gender",
        "date_of_birth",
        "photo_url",
    ];
}

/// Emergency contact aspect (`user_emergency_info`).
#[derive(Debug, Deserialize, Validate)]
pub struct UserEmergencyInfo {
    #[validate(length(max = 128))]
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_relation: Option<String>,
    #[validate(email)]
    pub emergency_contact_email: Option<String>,
    #[validate(custom(function = "crate::validation::rules::phone_number"))]
    pub emergency_contact_number: Option<String>,
}

impl Schema for UserEmergencyInfo {
    const NAME: &'static str = "UserEmergencyInfo";
    const FIELDS: &'static [&'static str] = &[
        "emergency_contact_name",
        "emergency_contact_relation",
        "emergency_contact_email",
        "emergency_contact_number",
    ];
}

/// Employer aspect (`user_employer_info`).
#[derive(Debug, Deserialize, Validate)]
pub struct UserEmployerInfo {
    #[validate(length(max = 128))]
    pub employer_name: Option<String>,
    pub occupation_status: Option<String>,
    #[validate(email)]
    pub occupation_email: Option<String>,
    #[validate(custom(function = "crate::validation::rules::phone_number"))]
    pub occupation_phone: Option<String>,
    pub occupation_location: Option<String>,
}

impl Schema for UserEmployerInfo {
    const NAME: &'static str = "UserEmployerInfo";
    const FIELDS: &'static [&'static str] = &[
        "employer_name",
        "occupation_status",
        "occupation_email",
        "occupation_phone",
        "occupation_location",
    ];
}

/// Auth credentials aspect (`user_auth_info`).
#[derive(Debug, Deserialize, Validate)]
pub struct UserAuthInfo {
    pub login_provider: Option<String>,
    pub reset_token: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_ext::timestamp_opt::deserialize")]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub verified: Option<bool>,
    pub is_subscribed: Option<bool>,
    pub is_disabled: Option<bool>,
}

impl Schema for UserAuthInfo {
    const NAME: &'static str = "UserAuthInfo";
    const FIELDS: &'static [&'static str] = &[
        "login_provider",
        "reset_token",
        "reset_token_expiry",
        "verified",
        "is_subscribed",
        "is_disabled",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldMap;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_base_projection_drops_nested_aspects() {
        let data = payload(json!({
            "email": "a@b.com",
            "first_name": "A",
            "address": { "street": "1 Main St" },
            "user_auth_info": { "verified": true }
        }));

        let base = UserBase::project(&data, None).unwrap().unwrap();
        assert_eq!(base, payload(json!({ "email": "a@b.com", "first_name": "A" })));
    }

    #[test]
    fn test_base_rejects_bad_email() {
        let data = payload(json!({ "email": "nope" }));
        let err = UserBase::project(&data, None).unwrap_err();
        assert!(err.to_string().contains("Invalid email address"));
    }

    #[test]
    fn test_base_phone_number_is_checked() {
        let valid = payload(json!({ "phone_number": "+1 (555) 010-9999" }));
        assert!(UserBase::project(&valid, None).unwrap().is_some());

        let invalid = payload(json!({ "phone_number": "call me" }));
        let err = UserBase::project(&invalid, None).unwrap_err();
        assert!(err.to_string().contains("phone_number: invalid_phone_number"));
    }

    #[test]
    fn test_emergency_aspect() {
        let data = payload(json!({
            "user_emergency_info": {
                "emergency_contact_name": "B",
                "emergency_contact_number": "+1 555 0100",
                "ssn": "secret"
            }
        }));

        let info = UserEmergencyInfo::project(&data, Some("user_emergency_info"))
            .unwrap()
            .unwrap();
        assert_eq!(info.len(), 2);
        assert!(!info.contains_key("ssn"));
    }

    #[test]
    fn test_auth_aspect_types_are_checked() {
        let data = payload(json!({ "user_auth_info": { "verified": "yes" } }));
        assert!(UserAuthInfo::project(&data, Some("user_auth_info")).is_err());
    }
}
