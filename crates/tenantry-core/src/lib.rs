//! # Tenantry Core
//!
//! Core types, record contracts, and error definitions shared by the
//! Tenantry data-access layer: the outcome envelope every DAO returns, the
//! [`Record`] capability the generic store is parameterized over, and the
//! [`Schema`] capability that projects untyped payloads onto declared
//! field sets.

pub mod domain;
pub mod error;
pub mod id;
pub mod pagination;
pub mod record;
pub mod result;
pub mod schema;
pub mod serde_ext;
pub mod telemetry;
pub mod validation;

pub use domain::*;
pub use error::*;
pub use id::*;
pub use pagination::*;
pub use record::*;
pub use result::*;
pub use schema::*;
pub use validation::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
