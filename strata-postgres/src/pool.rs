//! Connection pool for PostgreSQL.

use std::sync::Arc;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::config::PgConfig;
use crate::connection::PgConnection;
use crate::error::{PgError, PgResult};

/// A shared connection pool.
///
/// One pool serves every engine operation; a migration runner needs few
/// connections, so the pool stays small.
#[derive(Clone)]
pub struct PgPool {
    inner: Pool,
    config: Arc<PgConfig>,
}

/// Pool size for a migration runner; one connection would do, a couple
/// leave headroom for introspection during generate.
const MAX_POOL_SIZE: usize = 4;

impl PgPool {
    /// Create a pool from a DSN and verify the database answers.
    pub async fn connect(dsn: &str) -> PgResult<Self> {
        let config = PgConfig::from_dsn(dsn)?;
        let pool = Self::new(config)?;

        if let Err(e) = pool.ping().await {
            return Err(PgError::connection(format!(
                "failed to ping database: {e}"
            )));
        }
        Ok(pool)
    }

    /// Create a pool from parsed configuration without touching the
    /// database.
    pub fn new(config: PgConfig) -> PgResult<Self> {
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(config.to_pg_config(), NoTls, mgr_config);

        let pool = Pool::builder(mgr)
            .max_size(MAX_POOL_SIZE)
            .runtime(Runtime::Tokio1)
            .create_timeout(Some(config.connect_timeout))
            .wait_timeout(Some(config.connect_timeout))
            .build()
            .map_err(|e| PgError::config(format!("failed to create pool: {e}")))?;

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            inner: pool,
            config: Arc::new(config),
        })
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> PgResult<PgConnection> {
        debug!("acquiring connection from pool");
        let client = self.inner.get().await?;
        Ok(PgConnection::new(client))
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> PgResult<()> {
        let conn = self.get().await?;
        conn.query("SELECT 1", &[]).await?;
        Ok(())
    }

    /// The parsed configuration behind this pool.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Close the pool and all of its connections.
    pub fn close(&self) {
        self.inner.close();
        info!("PostgreSQL connection pool closed");
    }
}
