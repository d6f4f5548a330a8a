/// Signing configuration for login access tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
}

impl JwtConfig {
    pub fn new(secret: String, expiration_hours: u64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    /// Token lifetime.
    pub fn expiration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.expiration_hours as i64)
    }
}
