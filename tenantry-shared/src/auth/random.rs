/// Random identifiers for API keys, secrets and activation keys

use rand::Rng;

/// `[A-Za-z0-9]`, used for API keys and secrets
pub const BASE62: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// `[a-z0-9]`, used for activation keys sent to users
pub const LOWER_ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates `length` characters drawn uniformly from `charset`
pub fn random_string(length: usize, charset: &[u8]) -> String {
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}
