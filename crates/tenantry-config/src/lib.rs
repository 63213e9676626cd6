//! # Tenantry Config
//!
//! Layered configuration for the data-access layer: files, `.env`, and
//! environment variables, with runtime reload.

mod app_config;
mod loader;

pub use app_config::*;
pub use loader::*;
