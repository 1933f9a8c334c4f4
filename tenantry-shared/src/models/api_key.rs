/// API key model and database operations
///
/// API keys give a user's servers programmatic access without a JWT. Each key
/// belongs to exactly one user; every query below that takes a `user_id`
/// scopes its result to that owner.
///
/// # Security
///
/// - Only `sha256(key:secret)` is stored, never the secret
/// - The secret is returned once, on create and on reset
/// - Keys can be deactivated or limited to a `[start_date, end_date]` window
///
/// # Schema
///
/// ```sql
/// CREATE TABLE api_keys (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     key_type api_key_type NOT NULL DEFAULT 'public',
///     key VARCHAR(64) NOT NULL UNIQUE,
///     hash VARCHAR(64) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     start_date TIMESTAMPTZ,
///     end_date TIMESTAMPTZ,
///     last_used_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::models::api_key::{ApiKey, ApiKeyType, CreateApiKey};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let (api_key, secret) = ApiKey::create(&pool, CreateApiKey {
///     user_id,
///     name: "Billing sync".to_string(),
///     key_type: ApiKeyType::Private,
///     start_date: None,
///     end_date: None,
/// }).await?;
///
/// // The secret is never readable again
/// println!("x-api-key: {}:{}", api_key.key, secret);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::auth::api_key::{generate_credentials, generate_secret, hash_credentials};
use crate::pagination::filter::{FilterEnum, FilterSet};
use crate::pagination::query::{push_order_and_limit, push_where};
use crate::pagination::PaginationList;

const API_KEY_COLUMNS: &str = "id, user_id, name, key_type, key, hash, is_active, start_date, \
     end_date, last_used_at, created_at, updated_at";

/// Columns matched by the list `search` parameter
pub const SEARCHABLE_COLUMNS: &[&str] = &["name", "key"];

/// Columns accepted by the list `orderBy` parameter
pub const ORDERABLE_COLUMNS: &[&str] = &["created_at", "name"];

/// Which routes a key may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "api_key_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyType {
    #[default]
    Public,
    Private,
}

impl FilterEnum for ApiKeyType {
    const VARIANTS: &'static [Self] = &[ApiKeyType::Public, ApiKeyType::Private];

    fn label(&self) -> &'static str {
        match self {
            ApiKeyType::Public => "public",
            ApiKeyType::Private => "private",
        }
    }
}

/// API key record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Owner
    #[serde(rename = "user")]
    pub user_id: Uuid,

    pub name: String,

    #[serde(rename = "type")]
    pub key_type: ApiKeyType,

    /// Public half of the credential, used for lookup
    pub key: String,

    /// `sha256(key:secret)` as hex
    #[serde(skip_serializing)]
    pub hash: String,

    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an API key
#[derive(Debug, Clone)]
pub struct CreateApiKey {
    pub user_id: Uuid,
    pub name: String,
    pub key_type: ApiKeyType,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Input for `PUT /user/api-key/update/:id`
///
/// Dates are replaced as given, so `None` clears the window.
#[derive(Debug, Clone)]
pub struct UpdateApiKey {
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Creates a key and returns it with the plaintext secret
    pub async fn create(pool: &PgPool, data: CreateApiKey) -> Result<(Self, String), sqlx::Error> {
        let credentials = generate_credentials();

        let query = format!(
            r#"
            INSERT INTO api_keys (user_id, name, key_type, key, hash, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {API_KEY_COLUMNS}
            "#
        );

        let api_key = sqlx::query_as::<_, ApiKey>(&query)
            .bind(data.user_id)
            .bind(data.name)
            .bind(data.key_type)
            .bind(&credentials.key)
            .bind(&credentials.hash)
            .bind(data.start_date)
            .bind(data.end_date)
            .fetch_one(pool)
            .await?;

        Ok((api_key, credentials.secret))
    }

    /// Looks a key up by its public half (used by the `x-api-key` guard)
    pub async fn find_by_key(pool: &PgPool, key: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key = $1");

        sqlx::query_as::<_, ApiKey>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Looks a key up by id, only if `user_id` owns it
    pub async fn find_for_owner(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, ApiKey>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateApiKey) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET name = $2, start_date = $3, end_date = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.start_date)
        .bind(data.end_date)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the secret, keeping the public key
    ///
    /// Returns the new plaintext secret, or `None` if the key vanished.
    pub async fn reset_secret(&self, pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
        let secret = generate_secret();
        let hash = hash_credentials(&self.key, &secret);

        let result = sqlx::query("UPDATE api_keys SET hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(self.id)
            .bind(hash)
            .execute(pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(secret))
    }

    pub async fn set_active(pool: &PgPool, id: Uuid, is_active: bool) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE api_keys SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(is_active)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_last_used(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// One page of keys; callers put the owner filter in `filters`
    pub async fn list(
        pool: &PgPool,
        filters: &FilterSet,
        pagination: &PaginationList,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {API_KEY_COLUMNS} FROM api_keys"));
        push_where(&mut builder, filters, Some(pagination));
        push_order_and_limit(&mut builder, pagination);

        builder.build_query_as::<ApiKey>().fetch_all(pool).await
    }

    pub async fn count(
        pool: &PgPool,
        filters: &FilterSet,
        pagination: Option<&PaginationList>,
    ) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM api_keys");
        push_where(&mut builder, filters, pagination);

        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// True once `end_date` has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }

    /// True when `now` falls inside the optional `[start_date, end_date]` window
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_date.map_or(true, |start| start <= now);
        started && !self.is_expired(now)
    }
}
