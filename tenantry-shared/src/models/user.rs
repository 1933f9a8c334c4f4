/// User model and database operations
///
/// Users register themselves with a username and password, activate the
/// account with the key they received, and then log in for JWT tokens.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(100) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     password_expired_at TIMESTAMPTZ NOT NULL,
///     name VARCHAR(255),
///     email VARCHAR(255),
///     phone VARCHAR(50),
///     address TEXT,
///     status user_status NOT NULL DEFAULT 'inactive',
///     user_type user_type NOT NULL DEFAULT 'member',
///     sign_up_from user_sign_up_from NOT NULL DEFAULT 'local',
///     active_key VARCHAR(100) NOT NULL DEFAULT '',
///     active_expire TIMESTAMPTZ,
///     activated_at TIMESTAMPTZ,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::{Duration, Utc};
/// use tenantry_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let now = Utc::now();
/// let user = User::create(&pool, CreateUser {
///     username: "liana_mayert".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Liana Mayert".to_string()),
///     email: None,
///     phone: None,
///     address: None,
///     active_key: "k".repeat(100),
///     active_expire: now + Duration::hours(72),
///     password_expired_at: now + Duration::days(182),
/// }).await?;
///
/// let found = User::find_by_username(&pool, "liana_mayert").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::api_key::constant_time_compare;
use crate::auth::password::is_password_expired;
use crate::pagination::filter::{FilterEnum, FilterSet};
use crate::pagination::query::{push_order_and_limit, push_where};
use crate::pagination::PaginationList;

const USER_COLUMNS: &str = "id, username, password_hash, password_expired_at, name, email, \
     phone, address, status, user_type, sign_up_from, active_key, active_expire, \
     activated_at, last_login_at, created_at, updated_at";

/// Columns matched by the admin list `search` parameter
pub const SEARCHABLE_COLUMNS: &[&str] = &["username", "name", "email"];

/// Columns accepted by the admin list `orderBy` parameter
pub const ORDERABLE_COLUMNS: &[&str] = &["created_at", "username", "name"];

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Inactive,
    Active,
    Closed,
    Canceled,
    Blacklisted,
    None,
}

impl FilterEnum for UserStatus {
    const VARIANTS: &'static [Self] = &[
        UserStatus::Inactive,
        UserStatus::Active,
        UserStatus::Closed,
        UserStatus::Canceled,
        UserStatus::Blacklisted,
        UserStatus::None,
    ];

    fn label(&self) -> &'static str {
        match self {
            UserStatus::Inactive => "inactive",
            UserStatus::Active => "active",
            UserStatus::Closed => "closed",
            UserStatus::Canceled => "canceled",
            UserStatus::Blacklisted => "blacklisted",
            UserStatus::None => "none",
        }
    }
}

/// Role of the account; `SuperAdmin` unlocks the admin routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    SuperAdmin,
    Member,
    Manager,
    Receptionist,
}

impl FilterEnum for UserType {
    const VARIANTS: &'static [Self] = &[
        UserType::SuperAdmin,
        UserType::Member,
        UserType::Manager,
        UserType::Receptionist,
    ];

    fn label(&self) -> &'static str {
        match self {
            UserType::SuperAdmin => "super_admin",
            UserType::Member => "member",
            UserType::Manager => "manager",
            UserType::Receptionist => "receptionist",
        }
    }
}

/// How the account was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_sign_up_from", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserSignUpFrom {
    Local,
    Google,
}

/// User account
///
/// The password hash and activation key never leave the server: both are
/// skipped when the user is serialized into a response.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Argon2id hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Login is refused after this instant
    pub password_expired_at: DateTime<Utc>,

    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    pub status: UserStatus,

    #[serde(rename = "type")]
    pub user_type: UserType,

    pub sign_up_from: UserSignUpFrom,

    /// Activation key; empty once the account is activated
    #[serde(skip_serializing)]
    pub active_key: String,

    #[serde(skip_serializing)]
    pub active_expire: Option<DateTime<Utc>>,

    pub activated_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new user
///
/// Status, type and sign-up source take their registration defaults
/// (`inactive`, `member`, `local`).
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub active_key: String,
    pub active_expire: DateTime<Utc>,
    pub password_expired_at: DateTime<Utc>,
}

/// Why an activation attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("Activation key is invalid")]
    KeyInvalid,

    #[error("Activation key has expired")]
    KeyExpired,
}

/// Why a correctly authenticated user may still not log in
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoginDenied {
    #[error("User is not active")]
    Inactive,

    #[error("Password has expired")]
    PasswordExpired,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// A duplicate username surfaces as a unique-violation database error;
    /// callers check [`User::exists_by_username`] first to answer with a
    /// proper conflict.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, password_hash, password_expired_at, name, email,
                               phone, address, active_key, active_expire)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.password_hash)
            .bind(data.password_expired_at)
            .bind(data.name)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.address)
            .bind(data.active_key)
            .bind(data.active_expire)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists_by_username(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await
    }

    /// Marks the account active and burns the activation key
    pub async fn activate(
        pool: &PgPool,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET status = 'active',
                activated_at = $2,
                active_key = '',
                active_expire = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// One page of users matching `filters` and the pagination search term
    pub async fn list(
        pool: &PgPool,
        filters: &FilterSet,
        pagination: &PaginationList,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_where(&mut builder, filters, Some(pagination));
        push_order_and_limit(&mut builder, pagination);

        builder.build_query_as::<User>().fetch_all(pool).await
    }

    /// Number of users matching `filters` (and the search term, when given)
    pub async fn count(
        pool: &PgPool,
        filters: &FilterSet,
        pagination: Option<&PaginationList>,
    ) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_where(&mut builder, filters, pagination);

        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Number of users created within `[start, end]`
    pub async fn count_created_between(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at BETWEEN $1 AND $2")
            .bind(start)
            .bind(end)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Checks a presented activation key
    ///
    /// The key is compared before the expiry, so an already activated
    /// account (empty stored key) always reports [`ActivationError::KeyInvalid`].
    pub fn verify_activation(&self, key: &str, now: DateTime<Utc>) -> Result<(), ActivationError> {
        if self.active_key.is_empty() || !constant_time_compare(&self.active_key, key) {
            return Err(ActivationError::KeyInvalid);
        }

        match self.active_expire {
            Some(expire) if expire >= now => Ok(()),
            _ => Err(ActivationError::KeyExpired),
        }
    }

    /// Status and password-expiry checks run after the password matched
    pub fn check_can_login(&self, now: DateTime<Utc>) -> Result<(), LoginDenied> {
        if self.status != UserStatus::Active {
            return Err(LoginDenied::Inactive);
        }

        if is_password_expired(Some(self.password_expired_at), now) {
            return Err(LoginDenied::PasswordExpired);
        }

        Ok(())
    }
}
