use anyhow::{Context, Result};
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

use super::PostgresConfig;

/// Pooled handle shared by every PostgreSQL repository
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Build the pool. Connections are opened lazily on first checkout.
    pub fn from_config(config: &PostgresConfig) -> Result<Self> {
        let mut pool_config = Config::new();
        pool_config.host = Some(config.host.clone());
        pool_config.port = Some(config.port);
        pool_config.dbname = Some(config.database.clone());
        pool_config.user = Some(config.username.clone());
        pool_config.password = Some(config.password.clone());
        pool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pool_config.pool = Some(PoolConfig::new(config.max_pool_size));

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .with_context(|| format!("invalid postgres settings for {}", config.host))?;

        Ok(Self { pool })
    }

    /// Round-trip a trivial query so startup fails fast on a bad database
    pub async fn ping(&self) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.query_one("SELECT 1", &[])
            .await
            .context("postgres ping failed")?;
        debug!("postgres reachable");
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .context("no postgres connection available")
    }
}
