//! Contracts and contract types.

use crate::serde_ext::{timestamp, timestamp_opt};
use crate::{Record, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Active,
    Expired,
    Terminated,
}

/// A category of contract with its default fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractType {
    #[serde(default = "Uuid::now_v7")]
    pub contract_type_id: Uuid,
    pub contract_type_name: String,
    #[serde(default)]
    pub fee_percentage: Option<f64>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Record for ContractType {
    const TABLE: &'static str = "contract_type";
    const ENTITY_TYPE: &'static str = "ContractType";
    const PRIMARY_KEY: &'static str = "contract_type_id";
    const FIELDS: &'static [&'static str] = &[
        "contract_type_id",
        "contract_type_name",
        "fee_percentage",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.contract_type_id)
    }

    fn touch(&mut self) {
        self.updated_at = timestamp::now();
    }
}

/// A signed contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default = "Uuid::now_v7")]
    pub contract_id: Uuid,
    #[serde(default)]
    pub contract_type_id: Option<Uuid>,
    #[serde(default)]
    pub num_invoices: Option<i32>,
    #[serde(default)]
    pub payment_amount: Option<f64>,
    #[serde(default)]
    pub fee_percentage: Option<f64>,
    #[serde(default)]
    pub fee_amount: Option<f64>,
    #[serde(default, with = "timestamp_opt")]
    pub date_signed: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp_opt")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contract_status: ContractStatus,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "timestamp::now", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Fee derived from the payment amount and percentage, when both are set.
    #[must_use]
    pub fn computed_fee(&self) -> Option<f64> {
        Some(self.payment_amount? * self.fee_percentage? / 100.0)
    }
}

impl Record for Contract {
    const TABLE: &'static str = "contract";
    const ENTITY_TYPE: &'static str = "Contract";
    const PRIMARY_KEY: &'static str = "contract_id";
    const FIELDS: &'static [&'static str] = &[
        "contract_id",
        "contract_type_id",
        "num_invoices",
        "payment_amount",
        "fee_percentage",
        "fee_amount",
        "date_signed",
        "start_date",
        "end_date",
        "contract_status",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> RecordKey {
        RecordKey::Uuid(self.contract_id)
    }

    fn touch(&mut self) {
        self.updated_at = timestamp::now();
    }
}
