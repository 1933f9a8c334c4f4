/// Database models for Tenantry
///
/// Each model owns its SQL. List and count queries take a
/// [`FilterSet`](crate::pagination::filter::FilterSet) and a
/// [`PaginationList`](crate::pagination::PaginationList) so that handlers
/// never assemble SQL themselves.
///
/// # Models
///
/// - `user`: user accounts, activation and login checks
/// - `api_key`: per-user API keys for programmatic access
///
/// # Example
///
/// ```no_run
/// use tenantry_shared::models::user::User;
/// use tenantry_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let user = User::find_by_username(&pool, "liana_mayert").await?;
/// # Ok(())
/// # }
/// ```

pub mod api_key;
pub mod user;
