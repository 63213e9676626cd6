//! Persisted record types.

mod address;
mod contract;
mod role;
mod user;

pub use address::*;
pub use contract::*;
pub use role::*;
pub use user::*;
