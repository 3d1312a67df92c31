/// Access token signing and validation
///
/// Tokens are HS256-signed with a single shared secret loaded at startup.
/// The feed service both issues and validates them, so there is no
/// public/private key split.
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::JwtKeys;
/// use uuid::Uuid;
///
/// let keys = JwtKeys::from_secret("a-long-random-secret-loaded-from-env", 3600).unwrap();
/// let user_id = Uuid::new_v4();
/// let token = keys.issue_token(user_id, "user@example.com").unwrap();
/// let claims = keys.validate_token(&token).unwrap();
/// assert_eq!(claims.user_id().unwrap(), user_id);
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Default token lifetime: one hour.
pub const DEFAULT_EXPIRY_SECS: i64 = 3600;

/// Claims carried by every access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Email address at the time of login
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
    }
}

/// Signing and verification keys derived from one shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_secs: i64,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("secret", &"[REDACTED]")
            .field("expiry_secs", &self.expiry_secs)
            .finish()
    }
}

impl JwtKeys {
    /// Build keys from a shared secret.
    ///
    /// ## Errors
    ///
    /// Returns error if the secret is empty or the expiry is not positive.
    pub fn from_secret(secret: &str, expiry_secs: i64) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(anyhow!("JWT secret must not be empty"));
        }
        if expiry_secs <= 0 {
            return Err(anyhow!("JWT expiry must be positive, got {expiry_secs}"));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs,
        })
    }

    /// Issue an access token for a user
    pub fn issue_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let expiry = now + Duration::seconds(self.expiry_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to generate access token: {e}"))
    }

    /// Validate and decode a token (without the "Bearer " prefix)
    ///
    /// ## Errors
    ///
    /// Returns error if:
    /// - Token signature is invalid
    /// - Token is expired
    /// - Token format is malformed
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }
}
