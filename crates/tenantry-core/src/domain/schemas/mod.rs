//! Payload field sets, one per aspect of the user aggregate.

mod address;
mod user;

pub use address::*;
pub use user::*;
