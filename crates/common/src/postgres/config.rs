use serde::{Deserialize, Serialize};

/// PostgreSQL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: usize,
    /// Seconds a caller waits for a pooled connection (also bounds connect
    /// and recycle) before the pool gives up
    pub pool_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "air_controller_db".to_string(),
            username: "aircontrol".to_string(),
            password: "aircontrol".to_string(),
            max_pool_size: 10,
            pool_timeout_secs: 5,
        }
    }
}
