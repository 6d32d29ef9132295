use anyhow::{Context, Result};
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::debug;

use crate::postgres::PostgresConfig;

const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Pooled PostgreSQL access shared by the repositories.
///
/// Checkouts are bounded: once the pool is exhausted a caller waits at most
/// the configured timeout and then gets an error instead of blocking.
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Creates a pool with the default checkout timeout
    pub fn new(
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
        max_pool_size: usize,
    ) -> Result<Self> {
        Self::with_timeout(
            host,
            port,
            database,
            username,
            password,
            max_pool_size,
            DEFAULT_POOL_TIMEOUT,
        )
    }

    pub fn from_config(config: &PostgresConfig) -> Result<Self> {
        Self::with_timeout(
            &config.host,
            config.port,
            &config.database,
            &config.username,
            &config.password,
            config.max_pool_size,
            Duration::from_secs(config.pool_timeout_secs),
        )
    }

    fn with_timeout(
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
        max_pool_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(host.to_string());
        cfg.port = Some(port);
        cfg.dbname = Some(database.to_string());
        cfg.user = Some(username.to_string());
        cfg.password = Some(password.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig {
            max_size: max_pool_size,
            timeouts: Timeouts {
                wait: Some(timeout),
                create: Some(timeout),
                recycle: Some(timeout),
            },
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("Failed to create PostgreSQL pool")?;

        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client.execute("SELECT 1", &[]).await?;
        debug!("postgreSQL connection successful");
        Ok(())
    }

    /// Checks a connection out of the pool, failing once the wait timeout elapses
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .context("Failed to get PostgreSQL connection from pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_applies_pool_settings() {
        let config = PostgresConfig {
            max_pool_size: 3,
            pool_timeout_secs: 2,
            ..PostgresConfig::default()
        };

        let client = PostgresClient::from_config(&config).unwrap();
        assert_eq!(client.pool.status().max_size, 3);
        assert_eq!(client.pool.timeouts().wait, Some(Duration::from_secs(2)));
    }
}
