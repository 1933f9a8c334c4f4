/// Password hashing and password policy
///
/// Hashes are Argon2id PHC strings (64 MB memory, 3 passes, 4 lanes). The
/// strength policy mirrors what registration accepts: at least 8 characters
/// with an uppercase letter, a lowercase letter, a digit and a symbol.
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("pMYOA9@@!123")?;
/// assert!(verify_password("pMYOA9@@!123", &hash)?);
/// assert!(!verify_password("pMYOA9@@!124", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use validator::ValidationError;

/// Minimum accepted password length
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Stored hash could not be parsed
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// A strength rule the password failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Symbol,
}

impl PasswordRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordRule::MinLength => "minLength",
            PasswordRule::Uppercase => "uppercase",
            PasswordRule::Lowercase => "lowercase",
            PasswordRule::Digit => "digit",
            PasswordRule::Symbol => "symbol",
        }
    }
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password, returning the PHC string (`$argon2id$v=19$m=65536,t=3,p=4$...`)
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash is
/// malformed. Parameters are read from the hash itself, so hashes created with
/// older parameters still verify.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::InvalidHash(e.to_string())),
    }
}

/// Checks a password against the strength policy
///
/// Rules are checked in a fixed order and the first failure is reported.
pub fn check_password_strength(password: &str) -> Result<(), PasswordRule> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(PasswordRule::MinLength);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordRule::Lowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordRule::Digit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        return Err(PasswordRule::Symbol);
    }

    Ok(())
}

/// `validator` custom rule wrapping [`check_password_strength`]
///
/// Fails with code `passwordWeak` and a `rule` parameter naming the broken rule.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    check_password_strength(password).map_err(|rule| {
        let mut error = ValidationError::new("passwordWeak");
        error.add_param(Cow::Borrowed("rule"), &rule.as_str());
        error
    })
}

/// Whether a password with the given expiry must be changed before login
pub fn is_password_expired(expired_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expired_at, Some(at) if at <= now)
}
