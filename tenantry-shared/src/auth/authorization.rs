/// Role checks
///
/// Admin routes are restricted by [`UserType`]. Ownership of API keys is
/// enforced in the queries themselves (see `ApiKey::find_for_owner`).
///
/// # Example
///
/// ```
/// use tenantry_shared::auth::authorization::require_user_type;
/// use tenantry_shared::auth::jwt::TokenType;
/// use tenantry_shared::auth::middleware::AuthContext;
/// use tenantry_shared::models::user::UserType;
/// use uuid::Uuid;
///
/// let auth = AuthContext {
///     user_id: Uuid::new_v4(),
///     username: "liana_mayert".to_string(),
///     user_type: UserType::Member,
///     token_type: TokenType::Access,
/// };
///
/// assert!(require_user_type(&auth, &[UserType::SuperAdmin]).is_err());
/// ```

use super::middleware::AuthContext;
use crate::models::user::UserType;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The caller's user type is not in the allowed set
    #[error("User type {actual:?} is not allowed")]
    UserTypeNotAllowed { actual: UserType },
}

/// Allows the request only for the listed user types
pub fn require_user_type(auth: &AuthContext, allowed: &[UserType]) -> Result<(), AuthzError> {
    if allowed.contains(&auth.user_type) {
        Ok(())
    } else {
        Err(AuthzError::UserTypeNotAllowed {
            actual: auth.user_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenType;
    use uuid::Uuid;

    fn auth(user_type: UserType) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: "liana_mayert".to_string(),
            user_type,
            token_type: TokenType::Access,
        }
    }

    #[test]
    fn test_require_user_type() {
        assert!(require_user_type(&auth(UserType::SuperAdmin), &[UserType::SuperAdmin]).is_ok());
        assert_eq!(
            require_user_type(&auth(UserType::Manager), &[UserType::SuperAdmin]),
            Err(AuthzError::UserTypeNotAllowed {
                actual: UserType::Manager
            })
        );
    }
}
