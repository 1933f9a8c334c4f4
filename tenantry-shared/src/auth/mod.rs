/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing, strength rules and expiry
/// - [`jwt`]: access and refresh tokens
/// - [`api_key`]: API-key credential generation and verification
/// - [`random`]: random identifiers
/// - [`middleware`]: bearer and `x-api-key` request guards
/// - [`authorization`]: user-type checks
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Str0ng!Passw0rd")?;
/// assert!(verify_password("Str0ng!Passw0rd", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod random;
