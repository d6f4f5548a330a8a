use crate::config::PostgresConfig;
use anyhow::Result;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

/// Pooled connection handle shared by the document store.
///
/// Cloning is cheap; every clone draws from the same pool.
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Builds the pool from connection settings.
    pub fn from_config(config: &PostgresConfig) -> Result<Self> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.username)
            .password(&config.password);

        let manager = Manager::from_config(
            pg,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .runtime(Runtime::Tokio1)
            .max_size(config.max_pool_size)
            .build()?;

        Ok(Self { pool })
    }

    /// Convenience constructor for callers holding loose settings.
    pub fn new(
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
        max_pool_size: usize,
    ) -> Result<Self> {
        Self::from_config(&PostgresConfig {
            host: host.to_string(),
            port,
            database: database.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            max_pool_size,
        })
    }

    /// Round-trips a trivial statement to verify the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.simple_query("SELECT 1").await?;
        debug!("database connection verified");
        Ok(())
    }

    /// Checks out a pooled connection.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }
}
