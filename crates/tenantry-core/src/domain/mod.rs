//! Domain records and the payload schemas that feed them.

pub mod entities;
pub mod schemas;

pub use entities::*;
pub use schemas::*;
