use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Document store backend ("memory" or "postgres")
    #[serde(default = "default_store_backend")]
    pub store_backend: String,

    // PostgreSQL configuration (used when store_backend = "postgres")
    /// PostgreSQL host
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// PostgreSQL port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// PostgreSQL database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// PostgreSQL username
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    /// PostgreSQL password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Maximum PostgreSQL pool size
    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    // JWT configuration
    /// JWT signing secret (required for production)
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// JWT token expiration in hours (default: 24)
    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: u64,

    // Demo scenario configuration
    /// Email of the demo back-office user
    #[serde(default = "default_demo_email")]
    pub demo_email: String,

    /// Password of the demo back-office user
    #[serde(default = "default_demo_password")]
    pub demo_password: String,

    /// Display name of the demo back-office user
    #[serde(default = "default_demo_name")]
    pub demo_name: String,

    /// Factory the demo allocates order IDs for
    #[serde(default = "default_factory_key")]
    pub factory_key: String,

    /// Number of concurrent order creations in the demo burst
    #[serde(default = "default_order_burst")]
    pub order_burst: usize,

    // Allocator retry policy
    /// Retries allowed after the first allocation attempt
    #[serde(default = "default_allocator_max_retry_attempts")]
    pub allocator_max_retry_attempts: u32,

    /// Base delay between allocation retries in milliseconds
    #[serde(default = "default_allocator_retry_delay_ms")]
    pub allocator_retry_delay_ms: u64,

    /// Upper bound of the random retry jitter in milliseconds
    #[serde(default = "default_allocator_retry_jitter_ms")]
    pub allocator_retry_jitter_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_backend() -> String {
    "memory".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "paymaster".to_string()
}

fn default_postgres_username() -> String {
    "paymaster".to_string()
}

fn default_postgres_password() -> String {
    "paymaster".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

// JWT defaults
fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_jwt_expiration_hours() -> u64 {
    24
}

// Demo scenario defaults
fn default_demo_email() -> String {
    "clerk@example.com".to_string()
}

fn default_demo_password() -> String {
    "securepassword123".to_string()
}

fn default_demo_name() -> String {
    "Demo Clerk".to_string()
}

fn default_factory_key() -> String {
    "gulbarga".to_string()
}

fn default_order_burst() -> usize {
    16
}

// Allocator defaults sized for the demo burst
fn default_allocator_max_retry_attempts() -> u32 {
    64
}

fn default_allocator_retry_delay_ms() -> u64 {
    5
}

fn default_allocator_retry_jitter_ms() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("PAYMASTER"))
            .build()?
            .try_deserialize()
    }
}
