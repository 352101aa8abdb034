use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::UserDto;

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub user: UserDto,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Random token ID; keeps tokens minted in the same second distinct
    pub jti: String,
}

#[derive(Serialize)]
struct SignedPayload<'a, T: Serialize> {
    #[serde(flatten)]
    payload: &'a T,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!("JWT service initialized with HS256 secret");

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_ttl: Duration::minutes(config.access_token_expiry_minutes),
            refresh_token_ttl: Duration::days(config.refresh_token_expiry_days),
        }
    }

    /// Sign `payload` with an expiry of `ttl` from now.
    pub fn sign<T: Serialize>(&self, payload: &T, ttl: Duration) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = SignedPayload {
            payload,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
    }

    /// Decode and check signature and expiry. Any failure yields `None`.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Token verification failed");
                None
            }
        }
    }

    /// Generate both access and refresh tokens for a profile
    pub fn generate_tokens(&self, user: &UserDto) -> Result<TokenPair, anyhow::Error> {
        Ok(TokenPair {
            access_token: self.sign(user, self.access_token_ttl)?,
            refresh_token: self.sign(user, self.refresh_token_ttl)?,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Option<TokenClaims> {
        self.verify(token)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Option<TokenClaims> {
        self.verify(token)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }
}
