/// Integration tests for the user and API-key models
///
/// Skipped when `DATABASE_URL` is unset. Every test works on its own freshly
/// registered user, so tests can run in parallel.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tenantry_shared::auth::api_key::verify_credentials;
use tenantry_shared::db::migrations::run_migrations;
use tenantry_shared::db::pool::{create_pool, DatabaseConfig};
use tenantry_shared::models::api_key::{self, ApiKey, ApiKeyType, CreateApiKey, UpdateApiKey};
use tenantry_shared::models::user::{self, CreateUser, User, UserStatus, UserType};
use tenantry_shared::pagination::filter::{
    filter_equal_enum, filter_in_boolean, filter_in_enum, filter_owner, FilterEnum, FilterSet,
};
use tenantry_shared::pagination::{PaginationOptions, PaginationQuery};
use uuid::Uuid;

async fn setup() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = create_pool(DatabaseConfig::with_url(url))
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Some(pool)
}

async fn register(pool: &PgPool) -> User {
    let now = Utc::now();
    User::create(
        pool,
        CreateUser {
            username: format!("user_{}", Uuid::new_v4().simple()),
            password_hash: "$argon2id$test".to_string(),
            name: Some("Liana Mayert".to_string()),
            email: Some("liana@example.com".to_string()),
            phone: None,
            address: None,
            active_key: "a".repeat(100),
            active_expire: now + Duration::hours(72),
            password_expired_at: now + Duration::days(182),
        },
    )
    .await
    .expect("Failed to create user")
}

#[tokio::test]
async fn test_user_registration_defaults() {
    let Some(pool) = setup().await else { return };

    let user = register(&pool).await;
    assert_eq!(user.status, UserStatus::Inactive);
    assert_eq!(user.user_type, UserType::Member);
    assert!(user.activated_at.is_none());

    assert!(User::exists_by_username(&pool, &user.username).await.unwrap());
    let found = User::find_by_username(&pool, &user.username).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    User::delete(&pool, user.id).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let Some(pool) = setup().await else { return };

    let user = register(&pool).await;
    let now = Utc::now();
    let duplicate = User::create(
        &pool,
        CreateUser {
            username: user.username.clone(),
            password_hash: "$argon2id$test".to_string(),
            name: None,
            email: None,
            phone: None,
            address: None,
            active_key: String::new(),
            active_expire: now,
            password_expired_at: now,
        },
    )
    .await;

    let err = duplicate.expect_err("Duplicate username should fail");
    assert!(err
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation()));

    User::delete(&pool, user.id).await.unwrap();
}

#[tokio::test]
async fn test_user_activation() {
    let Some(pool) = setup().await else { return };

    let user = register(&pool).await;
    assert!(User::activate(&pool, user.id, Utc::now()).await.unwrap());

    let active = User::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(active.status, UserStatus::Active);
    assert!(active.active_key.is_empty());
    assert!(active.active_expire.is_none());
    assert!(active.activated_at.is_some());
    assert!(active.check_can_login(Utc::now()).is_ok());

    User::delete(&pool, user.id).await.unwrap();
}

#[tokio::test]
async fn test_user_list_filters() {
    let Some(pool) = setup().await else { return };

    let user = register(&pool).await;
    let pagination = PaginationOptions::new(user::SEARCHABLE_COLUMNS, user::ORDERABLE_COLUMNS)
        .resolve(&PaginationQuery {
            search: Some(user.username.clone()),
            ..Default::default()
        });

    let inactive = FilterSet::new()
        .with(filter_in_enum("status", Some("inactive"), UserStatus::VARIANTS))
        .with(filter_equal_enum::<UserType>("user_type", Some("member"), None));
    let users = User::list(&pool, &inactive, &pagination).await.unwrap();
    assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![user.id]);
    assert_eq!(User::count(&pool, &inactive, Some(&pagination)).await.unwrap(), 1);

    let active = FilterSet::new().with(filter_in_enum("status", Some("active"), UserStatus::VARIANTS));
    assert_eq!(User::count(&pool, &active, Some(&pagination)).await.unwrap(), 0);

    User::delete(&pool, user.id).await.unwrap();
}

#[tokio::test]
async fn test_api_key_lifecycle() {
    let Some(pool) = setup().await else { return };

    let owner = register(&pool).await;
    let (key, secret) = ApiKey::create(
        &pool,
        CreateApiKey {
            user_id: owner.id,
            name: "Billing sync".to_string(),
            key_type: ApiKeyType::Private,
            start_date: None,
            end_date: None,
        },
    )
    .await
    .unwrap();

    assert!(key.is_active);
    assert!(verify_credentials(&key.key, &secret, &key.hash));

    // Scoped lookups
    assert!(ApiKey::find_for_owner(&pool, key.id, owner.id).await.unwrap().is_some());
    assert!(ApiKey::find_for_owner(&pool, key.id, Uuid::new_v4()).await.unwrap().is_none());

    // Reset keeps the public key and replaces the secret
    let new_secret = key.reset_secret(&pool).await.unwrap().unwrap();
    let reset = ApiKey::find_by_key(&pool, &key.key).await.unwrap().unwrap();
    assert!(verify_credentials(&reset.key, &new_secret, &reset.hash));
    assert!(!verify_credentials(&reset.key, &secret, &reset.hash));

    let now = Utc::now();
    assert!(ApiKey::update(
        &pool,
        key.id,
        UpdateApiKey {
            name: "Renamed".to_string(),
            start_date: Some(now - Duration::days(1)),
            end_date: Some(now + Duration::days(1)),
        },
    )
    .await
    .unwrap());

    assert!(ApiKey::set_active(&pool, key.id, false).await.unwrap());
    let updated = ApiKey::find_for_owner(&pool, key.id, owner.id).await.unwrap().unwrap();
    assert_eq!(updated.name, "Renamed");
    assert!(!updated.is_active);
    assert!(updated.is_within_window(now));

    ApiKey::touch_last_used(&pool, key.id).await.unwrap();
    assert!(ApiKey::find_by_key(&pool, &key.key)
        .await
        .unwrap()
        .unwrap()
        .last_used_at
        .is_some());

    assert!(ApiKey::delete(&pool, key.id).await.unwrap());
    assert!(ApiKey::find_by_key(&pool, &key.key).await.unwrap().is_none());

    User::delete(&pool, owner.id).await.unwrap();
}

#[tokio::test]
async fn test_api_key_list_is_owner_scoped() {
    let Some(pool) = setup().await else { return };

    let owner = register(&pool).await;
    let stranger = register(&pool).await;

    for (user_id, key_type) in [
        (owner.id, ApiKeyType::Public),
        (owner.id, ApiKeyType::Private),
        (stranger.id, ApiKeyType::Public),
    ] {
        ApiKey::create(
            &pool,
            CreateApiKey {
                user_id,
                name: format!("{key_type:?} key"),
                key_type,
                start_date: None,
                end_date: None,
            },
        )
        .await
        .unwrap();
    }

    let pagination = PaginationOptions::new(api_key::SEARCHABLE_COLUMNS, api_key::ORDERABLE_COLUMNS)
        .resolve(&PaginationQuery::default());

    let owned = FilterSet::new()
        .with(filter_owner("user_id", owner.id))
        .with(filter_in_boolean("is_active", None, &[true, false]));
    assert_eq!(ApiKey::list(&pool, &owned, &pagination).await.unwrap().len(), 2);

    let public = owned
        .clone()
        .with(filter_equal_enum("key_type", Some("public"), None::<ApiKeyType>));
    let keys = ApiKey::list(&pool, &public, &pagination).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key_type, ApiKeyType::Public);
    assert_eq!(ApiKey::count(&pool, &public, None).await.unwrap(), 1);

    User::delete(&pool, owner.id).await.unwrap();
    User::delete(&pool, stranger.id).await.unwrap();
}
