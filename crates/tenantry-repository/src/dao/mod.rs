//! Composite user data access.
//!
//! [`UserDao`] is the envelope-returning interface; [`CompositeUserDao`]
//! implements it over [`RecordStore`](crate::RecordStore) and
//! [`RelationLinker`](crate::RelationLinker), driving the aspect registry in
//! [`aspects`].

pub mod aspects;
mod user_dao;
mod user_dao_impl;

pub use aspects::{Aspect, AspectOutcome, AspectStatus};
pub use user_dao::{CompositeUser, UserDao};
pub use user_dao_impl::{CompositeUserDao, CompositeUserDaoParameters};
