use crate::auth::{AuthTokenProvider, JwtConfig};
use crate::domain::{DomainError, DomainResult};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by a login access token.
#[derive(Debug, Serialize, Deserialize)]
struct AccessTokenClaims {
    /// Subject, the user ID the token was issued for.
    sub: String,
    email: String,
    exp: i64,
    iat: i64,
}

/// [`AuthTokenProvider`] signing tokens with a shared secret (HS256).
pub struct JwtAuthTokenProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtAuthTokenProvider {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }
}

impl AuthTokenProvider for JwtAuthTokenProvider {
    fn generate_token(&self, user_id: &str, email: &str) -> DomainResult<String> {
        let issued_at = chrono::Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (issued_at + self.config.expiration()).timestamp(),
            iat: issued_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            DomainError::RepositoryError(anyhow::anyhow!("failed to sign access token: {e}"))
        })
    }

    fn validate_token(&self, token: &str) -> DomainResult<String> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|e| DomainError::InvalidToken(e.to_string()))
    }
}
