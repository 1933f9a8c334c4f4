/// JWT token generation and validation
///
/// Tokens are HS256-signed and carry the user's identity and type so that
/// role checks do not need a database round-trip.
///
/// # Token Types
///
/// - **Access Token**: short-lived (1 hour by default), sent as `Authorization: Bearer`
/// - **Refresh Token**: long-lived (14 days by default), exchanged for a new access token
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::jwt::{JwtSettings, TokenType};
/// use tenantry_shared::models::user::UserType;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = JwtSettings::new("a-secret-that-is-at-least-32-bytes!!");
/// let user_id = Uuid::new_v4();
///
/// let token = settings.issue(user_id, "Liana_Mayert68", UserType::Member, TokenType::Access)?;
/// let claims = settings.validate(&token, TokenType::Access)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserType;

/// Default issuer claim
pub const DEFAULT_ISSUER: &str = "tenantry";

/// Token prefix returned to clients as `tokenType`
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token was valid but of the other type
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus the username,
/// user type and token type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Username at the time the token was issued
    pub username: String,

    /// User type at the time the token was issued
    pub user_type: UserType,

    /// Token type
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims valid from now for `expires_in`
    pub fn new(
        user_id: Uuid,
        username: impl Into<String>,
        user_type: UserType,
        token_type: TokenType,
        issuer: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: issuer.into(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            username: username.into(),
            user_type,
            token_type,
        }
    }

    /// Seconds left before the token expires (zero once expired)
    pub fn expires_in(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Signing settings shared by the login, refresh and guard code paths
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC secret (at least 32 bytes)
    pub secret: String,

    /// Expected `iss` claim
    pub issuer: String,

    /// Access token lifetime
    pub access_expiration: Duration,

    /// Refresh token lifetime
    pub refresh_expiration: Duration,
}

impl JwtSettings {
    /// Settings with the default issuer and lifetimes (1 hour / 14 days)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_expiration: Duration::hours(1),
            refresh_expiration: Duration::days(14),
        }
    }

    /// Lifetime for the given token type
    pub fn expiration(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_expiration,
            TokenType::Refresh => self.refresh_expiration,
        }
    }

    /// Issues a signed token of the given type
    pub fn issue(
        &self,
        user_id: Uuid,
        username: &str,
        user_type: UserType,
        token_type: TokenType,
    ) -> Result<String, JwtError> {
        let claims = Claims::new(
            user_id,
            username,
            user_type,
            token_type,
            self.issuer.clone(),
            self.expiration(token_type),
        );
        create_token(&claims, &self.secret)
    }

    /// Validates signature, expiry, issuer and token type
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = validate_token(token, &self.secret, &self.issuer)?;

        if claims.token_type != expected {
            return Err(JwtError::WrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Decodes a token, checking signature, `exp`, `nbf` and `iss`
pub fn validate_token(token: &str, secret: &str, issuer: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: issuer.to_string(),
            },
            _ => JwtError::ValidationError(e.to_string()),
        })
}
