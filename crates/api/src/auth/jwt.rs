//! Actor tokens.
//!
//! Editors authenticate against the external authorization layer, which signs
//! HS256 tokens with a secret shared with this service. The backend only
//! verifies them; `sub` names the actor every lock and version is recorded
//! against.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pagetree_core::types::DbId;
use serde::{Deserialize, Serialize};

/// Claims this service reads from an actor token. Other claims are ignored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActorClaims {
    /// The acting user's id.
    pub sub: DbId,
    /// Expiry (UTC Unix timestamp).
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Shared secret for verifying actor tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

impl JwtConfig {
    /// Read `JWT_SECRET` from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");
        Self { secret }
    }
}

/// Verify an actor token's signature and expiry.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<ActorClaims, jsonwebtoken::errors::Error> {
    let data = decode::<ActorClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Sign a token for `actor` valid for `ttl`, as the authorization layer would.
pub fn issue_token(
    actor: DbId,
    ttl: Duration,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = ActorClaims {
        sub: actor,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}
