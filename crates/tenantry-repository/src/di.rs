//! Dependency injection module using Shaku.

use crate::dao::{CompositeUserDao, CompositeUserDaoParameters};
use crate::linker::RelationLinker;
use crate::pool::{DatabasePool, DatabasePoolInterface, DatabasePoolParameters};
use crate::store::RecordStore;
use shaku::module;
use std::sync::Arc;
use tenantry_config::{DaoConfig, DatabaseConfig};
use tenantry_core::DaoResult;

// Repository layer: the MySQL pool and the composite user DAO.
module! {
    pub RepositoryModule {
        components = [
            DatabasePool,
            CompositeUserDao,
        ],
        providers = [],
    }
}

/// Connects to the database and builds the repository module.
pub async fn build_repository_module(
    db_config: &DatabaseConfig,
    dao_config: &DaoConfig,
) -> DaoResult<Arc<RepositoryModule>> {
    let db_pool = DatabasePool::new(db_config).await?;

    let module = RepositoryModule::builder()
        .with_component_parameters::<DatabasePool>(DatabasePoolParameters {
            pool: db_pool.inner().clone(),
        })
        .with_component_parameters::<CompositeUserDao>(CompositeUserDaoParameters {
            users: RecordStore::with_config(dao_config),
            linker: RelationLinker::with_config(dao_config),
        })
        .build();

    Ok(Arc::new(module))
}
