//! The two accepted address shapes.
//!
//! A nested address that carries `address_id` refers to an existing row and
//! is projected through [`AddressSchema`]; one without it is a creation
//! request projected through [`AddressBase`].

use crate::validation::rules::not_blank;
use crate::{FieldMap, Schema};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Field name that marks a reference to an existing address.
pub const ADDRESS_ID_FIELD: &str = "address_id";

/// Creation shape: every address column except its identifier.
#[derive(Debug, Deserialize, Validate)]
pub struct AddressBase {
    pub address_type: Option<String>,
    pub title: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub street: Option<String>,
    pub street_2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    #[validate(length(max = 16))]
    pub postal_code: Option<String>,
}

impl Schema for AddressBase {
    const NAME: &'static str = "AddressBase";
    const FIELDS: &'static [&'static str] = &[
        "address_type",
        "title",
        "street",
        "street_2",
        "city",
        "region",
        "country",
        "postal_code",
    ];
}

/// Full shape: the creation fields plus `address_id`.
#[derive(Debug, Deserialize, Validate)]
pub struct AddressSchema {
    pub address_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: AddressBase,
}

impl Schema for AddressSchema {
    const NAME: &'static str = "Address";
    const FIELDS: &'static [&'static str] = &[
        ADDRESS_ID_FIELD,
        "address_type",
        "title",
        "street",
        "street_2",
        "city",
        "region",
        "country",
        "postal_code",
    ];
}

/// Returns true if an address payload refers to an existing address.
#[must_use]
pub fn carries_address_id(payload: &FieldMap) -> bool {
    payload.contains_key(ADDRESS_ID_FIELD)
}
