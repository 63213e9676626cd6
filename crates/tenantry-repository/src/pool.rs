//! MySQL connection pool and the session factory over it.

use crate::session::MySqlSession;
use async_trait::async_trait;
use shaku::Component;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::ConnectOptions;
use tenantry_config::DatabaseConfig;
use tenantry_core::{DaoError, DaoResult, Interface};
use tracing::{debug, info, warn};

/// Source of MySQL sessions for the DAOs.
#[async_trait]
pub trait DatabasePoolInterface: Interface + Send + Sync {
    /// Returns a reference to the underlying MySQL pool.
    fn inner(&self) -> &MySqlPool;

    /// Opens a new session that owns its own transaction.
    fn session(&self) -> MySqlSession {
        MySqlSession::new(self.inner().clone())
    }

    /// Checks if the database connection is healthy.
    async fn health_check(&self) -> DaoResult<()>;

    /// Applies the schema in `migrations/`.
    async fn run_migrations(&self) -> DaoResult<()>;
}

/// Database pool wrapper.
#[derive(Component)]
#[shaku(interface = DatabasePoolInterface)]
pub struct DatabasePool {
    pool: MySqlPool,
}

/// Parses the database URL, keeping statement logging only when
/// `log_queries` is set.
pub fn connect_options(config: &DatabaseConfig) -> DaoResult<MySqlConnectOptions> {
    let options: MySqlConnectOptions = config
        .url
        .parse()
        .map_err(|e| DaoError::Configuration(format!("Invalid database URL: {}", e)))?;
    Ok(if config.log_queries {
        options
    } else {
        options.disable_statement_logging()
    })
}

/// Pool sizing and timeouts from `config`.
#[must_use]
pub fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout())
        .idle_timeout(Some(config.idle_timeout()))
}

impl DatabasePool {
    /// Connects a pool described by `config`.
    pub async fn new(config: &DatabaseConfig) -> DaoResult<Self> {
        let options = connect_options(config)?;
        debug!(
            "Connecting to MySQL (min={}, max={})",
            config.min_connections, config.max_connections
        );

        let pool = pool_options(config).connect_with(options).await.map_err(|e| {
            warn!("Failed to connect to database: {}", e);
            DaoError::Storage(format!("Failed to connect: {}", e))
        })?;

        info!("MySQL connection pool established");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePoolInterface for DatabasePool {
    fn inner(&self) -> &MySqlPool {
        &self.pool
    }

    async fn health_check(&self) -> DaoResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DaoError::Storage(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    async fn run_migrations(&self) -> DaoResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DaoError::Storage(format!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("size", &self.pool.size())
            .field("num_idle", &self.pool.num_idle())
            .finish()
    }
}
