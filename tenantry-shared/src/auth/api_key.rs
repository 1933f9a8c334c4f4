/// API key credential utilities
///
/// An API key credential has two halves, sent together in the
/// `x-api-key: <key>:<secret>` header:
///
/// - **key**: `tk_` followed by 32 base62 characters. Stored in plaintext and
///   used to look the record up.
/// - **secret**: 48 base62 characters. Only returned when the key is created
///   or reset; the database keeps `sha256(key:secret)` as lowercase hex.
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::api_key::{generate_credentials, parse_header, verify_credentials};
///
/// let credentials = generate_credentials();
/// let header = format!("{}:{}", credentials.key, credentials.secret);
///
/// let (key, secret) = parse_header(&header).unwrap();
/// assert!(verify_credentials(key, secret, &credentials.hash));
/// ```

use sha2::{Digest, Sha256};

use super::random::{random_string, BASE62};

/// Header carrying `<key>:<secret>`
pub const API_KEY_HEADER: &str = "x-api-key";

/// Public key prefix
pub const KEY_PREFIX: &str = "tk_";

/// Random characters after the prefix
const KEY_RANDOM_LENGTH: usize = 32;

/// Secret length
pub const SECRET_LENGTH: usize = 48;

/// Total key length (prefix + random part)
pub const KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_LENGTH;

/// Freshly generated credentials
///
/// `secret` is the only copy of the plaintext secret; hand it to the caller
/// and persist `hash`.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
    pub hash: String,
}

/// Generates a new key, secret and the hash to store
pub fn generate_credentials() -> Credentials {
    let key = format!("{}{}", KEY_PREFIX, random_string(KEY_RANDOM_LENGTH, BASE62));
    let secret = generate_secret();
    let hash = hash_credentials(&key, &secret);

    Credentials { key, secret, hash }
}

/// Generates a replacement secret for an existing key
pub fn generate_secret() -> String {
    random_string(SECRET_LENGTH, BASE62)
}

/// SHA-256 over `key:secret`, hex encoded (64 characters)
pub fn hash_credentials(key: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(b":");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks the key shape: prefix, total length and base62 body
pub fn validate_key_format(key: &str) -> bool {
    key.len() == KEY_LENGTH
        && key.starts_with(KEY_PREFIX)
        && key[KEY_PREFIX.len()..].bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Splits an `x-api-key` header value into `(key, secret)`
///
/// Returns `None` when the separator is missing, either half is empty or the
/// key is malformed.
pub fn parse_header(value: &str) -> Option<(&str, &str)> {
    let (key, secret) = value.trim().split_once(':')?;

    if secret.is_empty() || !validate_key_format(key) {
        return None;
    }

    Some((key, secret))
}

/// Verifies a presented key/secret pair against the stored hash in constant time
pub fn verify_credentials(key: &str, secret: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_credentials(key, secret), stored_hash)
}

/// Compares two strings without short-circuiting on the first difference
///
/// Length is not secret here (both sides are fixed-length hashes), so a
/// length mismatch returns early.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
