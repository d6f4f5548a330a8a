use crate::domain::DomainResult;

/// Issues and checks the access tokens handed out at login.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthTokenProvider: Send + Sync {
    /// Issue an access token for the given user identity.
    fn generate_token(&self, user_id: &str, email: &str) -> DomainResult<String>;

    /// Check a token and return the user ID it was issued for.
    fn validate_token(&self, token: &str) -> DomainResult<String>;
}

/// Hashes login passwords and verifies them against stored hashes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordService: Send + Sync {
    fn hash_password(&self, password: &str) -> DomainResult<String>;

    /// `Ok(false)` is a mismatch; an unparseable stored hash is an error.
    fn verify_password(&self, password: &str, hash: &str) -> DomainResult<bool>;
}
