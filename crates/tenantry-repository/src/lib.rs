//! # Tenantry Repository
//!
//! Generic data access over a transactional session:
//!
//! ```text
//! caller
//!   ↓  Arc<dyn UserDao>            (envelope-returning interface)
//! CompositeUserDao                 (composite create/update orchestration)
//!   ↓                    ↓
//! RecordStore<T>     RelationLinker (generic CRUD, association links)
//!   ↓                    ↓
//! SessionScope / Session           (commit + refresh, rollback)
//!   ↓
//! MemoryStore | MySQL (SQLx)
//! ```
//!
//! ## Structure
//!
//! ```text
//! src/
//!   session/           ← Session trait, SessionScope, memory and MySQL backends
//!   store.rs           ← RecordStore<T>
//!   relations.rs       ← Eager loading (UserRelation)
//!   linker.rs          ← RelationLinker
//!   dao/
//!     aspects.rs       ← aspect registry and outcomes
//!     user_dao.rs      ← UserDao trait
//!     user_dao_impl.rs ← CompositeUserDao
//!   pool.rs            ← DatabasePool
//!   di.rs              ← RepositoryModule
//! ```

pub mod dao;
pub mod di;
pub mod linker;
pub mod pool;
pub mod relations;
pub mod session;
pub mod store;

pub use dao::*;
pub use di::*;
pub use linker::*;
pub use pool::*;
pub use relations::*;
pub use session::*;
pub use store::*;
