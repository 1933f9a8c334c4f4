/// End-to-end tests against PostgreSQL
///
/// Skipped when `DATABASE_URL` is unset. Each test registers its own users,
/// so tests can share one database and run in parallel.

mod common;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use common::{request, TestContext, STRONG_PASSWORD};
use serde_json::{json, Value};
use tenantry_shared::models::user::User;
use uuid::Uuid;

fn unique_username() -> String {
    format!("user_{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn register(ctx: &TestContext, username: &str) -> Uuid {
    let res = ctx
        .json(
            Method::POST,
            "/public/user/register",
            None,
            json!({
                "username": username,
                "password": STRONG_PASSWORD,
                "name": "Liana Mayert",
                "email": "liana@example.com"
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    Uuid::parse_str(res.data()["_id"].as_str().unwrap()).unwrap()
}

async fn activate(ctx: &TestContext, username: &str) {
    let user = User::find_by_username(&ctx.state.db, username)
        .await
        .unwrap()
        .unwrap();

    let res = ctx
        .json(
            Method::POST,
            "/public/user/active",
            None,
            json!({ "username": username, "activeKey": user.active_key }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
}

async fn login(ctx: &TestContext, username: &str) -> Value {
    let res = ctx
        .json(
            Method::POST,
            "/public/user/login",
            None,
            json!({ "username": username, "password": STRONG_PASSWORD }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    res.data().clone()
}

/// Registered, activated and logged in; returns the access token
async fn signed_in(ctx: &TestContext) -> (String, String) {
    let username = unique_username();
    register(ctx, &username).await;
    activate(ctx, &username).await;

    let tokens = login(ctx, &username).await;
    (username, tokens["accessToken"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_register_and_duplicate() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let username = unique_username();

    register(&ctx, &username).await;

    let res = ctx
        .json(
            Method::POST,
            "/public/user/register",
            None,
            json!({ "username": username, "password": STRONG_PASSWORD }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.message(), "Username is already taken");
}

#[tokio::test]
async fn test_activation_errors() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let username = unique_username();
    register(&ctx, &username).await;

    let res = ctx
        .json(
            Method::POST,
            "/public/user/active",
            None,
            json!({ "username": username, "activeKey": "wrong" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = ctx
        .json(
            Method::POST,
            "/public/user/active",
            None,
            json!({ "username": unique_username(), "activeKey": "wrong" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "User not found");

    sqlx::query("UPDATE users SET active_expire = NOW() - INTERVAL '1 hour' WHERE username = $1")
        .bind(&username)
        .execute(&ctx.state.db)
        .await
        .unwrap();
    let user = User::find_by_username(&ctx.state.db, &username)
        .await
        .unwrap()
        .unwrap();

    let res = ctx
        .json(
            Method::POST,
            "/public/user/active",
            None,
            json!({ "username": username, "activeKey": user.active_key }),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.message(), "Activation key has expired");
}

#[tokio::test]
async fn test_login_flow() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let username = unique_username();
    register(&ctx, &username).await;

    // Inactive until activated
    let res = ctx
        .json(
            Method::POST,
            "/public/user/login",
            None,
            json!({ "username": username, "password": STRONG_PASSWORD }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.message(), "User is not active");

    activate(&ctx, &username).await;

    let res = ctx
        .json(
            Method::POST,
            "/public/user/login",
            None,
            json!({ "username": username, "password": "Wrong@@!123" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Password does not match");

    let tokens = login(&ctx, &username).await;
    assert_eq!(tokens["tokenType"], "Bearer");
    assert_eq!(tokens["expiresIn"], 3600);

    let access = tokens["accessToken"].as_str().unwrap();
    let refresh = tokens["refreshToken"].as_str().unwrap();

    let res = ctx.get("/user/profile", Some(access)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["username"], username.as_str());
    assert_eq!(res.data()["status"], "active");
    assert!(res.data().get("passwordHash").is_none());
    assert!(res.data()["lastLoginAt"].is_string());

    let res = ctx
        .send(request(Method::POST, "/user/refresh", Some(refresh)).body(Body::empty()).unwrap())
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["refreshToken"], refresh);
    assert!(res.data()["accessToken"].is_string());
}

#[tokio::test]
async fn test_login_unknown_user() {
    let Some(ctx) = TestContext::with_database().await else { return };

    let res = ctx
        .json(
            Method::POST,
            "/public/user/login",
            None,
            json!({ "username": unique_username(), "password": STRONG_PASSWORD }),
        )
        .await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "User not found");
}

#[tokio::test]
async fn test_login_password_expired() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let username = unique_username();
    register(&ctx, &username).await;
    activate(&ctx, &username).await;

    sqlx::query("UPDATE users SET password_expired_at = NOW() - INTERVAL '1 day' WHERE username = $1")
        .bind(&username)
        .execute(&ctx.state.db)
        .await
        .unwrap();

    let res = ctx
        .json(
            Method::POST,
            "/public/user/login",
            None,
            json!({ "username": username, "password": STRONG_PASSWORD }),
        )
        .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.message(), "Password has expired");
}

#[tokio::test]
async fn test_api_key_lifecycle() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let (_, access) = signed_in(&ctx).await;
    let token = Some(access.as_str());

    let res = ctx
        .json(Method::POST, "/user/api-key/create", token, json!({ "name": "Billing sync" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.data()["_id"].as_str().unwrap().to_string();
    let key = res.data()["key"].as_str().unwrap().to_string();
    let secret = res.data()["secret"].as_str().unwrap().to_string();

    // Public keys may call hello
    let res = ctx
        .send(
            request(Method::GET, "/hello/api-key", None)
                .header("x-api-key", format!("{key}:{secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = ctx.get("/user/api-key/list?isActive=true", token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["_pagination"]["total"], 1);
    assert!(res.data()[0].get("hash").is_none());

    let res = ctx.get(&format!("/user/api-key/get/{id}"), token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["type"], "public");

    let res = ctx
        .json(
            Method::PUT,
            &format!("/user/api-key/update/{id}"),
            token,
            json!({
                "name": "Billing sync v2",
                "startDate": "2020-01-01T00:00:00Z",
                "endDate": "2099-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["_id"], id.as_str());

    let res = ctx
        .send(
            request(Method::PATCH, &format!("/user/api-key/update/{id}/reset"), token)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let new_secret = res.data()["secret"].as_str().unwrap().to_string();
    assert_ne!(new_secret, secret);

    // Old secret stops working
    let res = ctx
        .send(
            request(Method::GET, "/hello/api-key", None)
                .header("x-api-key", format!("{key}:{secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let patch = |path: String| {
        request(Method::PATCH, &path, token).body(Body::empty()).unwrap()
    };

    let res = ctx.send(patch(format!("/user/api-key/update/{id}/active"))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = ctx.send(patch(format!("/user/api-key/update/{id}/inactive"))).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = ctx
        .send(
            request(Method::GET, "/hello/api-key", None)
                .header("x-api-key", format!("{key}:{new_secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "API key is inactive");

    let res = ctx.send(patch(format!("/user/api-key/update/{id}/active"))).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = ctx
        .send(
            request(Method::DELETE, &format!("/user/api-key/delete/{id}"), token)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = ctx.get(&format!("/user/api-key/get/{id}"), token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_private_api_key_forbidden_on_public_route() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let (_, access) = signed_in(&ctx).await;

    let res = ctx
        .json(
            Method::POST,
            "/user/api-key/create",
            Some(&access),
            json!({ "name": "Internal", "type": "private" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let header = format!(
        "{}:{}",
        res.data()["key"].as_str().unwrap(),
        res.data()["secret"].as_str().unwrap()
    );
    let res = ctx
        .send(
            request(Method::GET, "/hello/api-key", None)
                .header("x-api-key", header)
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_api_keys_are_owner_scoped() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let (_, owner) = signed_in(&ctx).await;
    let (_, other) = signed_in(&ctx).await;

    let res = ctx
        .json(Method::POST, "/user/api-key/create", Some(&owner), json!({ "name": "Mine" }))
        .await;
    let id = res.data()["_id"].as_str().unwrap().to_string();

    let res = ctx.get(&format!("/user/api-key/get/{id}"), Some(&other)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "API key not found");
}

#[tokio::test]
async fn test_admin_user_list_and_dashboard() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let username = unique_username();
    register(&ctx, &username).await;
    activate(&ctx, &username).await;

    sqlx::query("UPDATE users SET user_type = 'super_admin' WHERE username = $1")
        .bind(&username)
        .execute(&ctx.state.db)
        .await
        .unwrap();
    let tokens = login(&ctx, &username).await;
    let access = tokens["accessToken"].as_str().unwrap();

    let res = ctx
        .get(
            &format!("/admin/user/list?search={username}&perPage=5&type=super_admin"),
            Some(access),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    assert_eq!(res.body["_pagination"]["total"], 1);
    assert_eq!(res.data()[0]["username"], username.as_str());
    assert_eq!(res.body["_metadata"]["pagination"]["perPage"], 5);

    let res = ctx.get("/admin/user/dashboard", Some(access)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["total"].as_i64().unwrap() >= 1);
    assert!(res.data()["count"].as_i64().unwrap() >= 1);

    let res = ctx.get("/admin/user/dashboard?startDate=yesterday", Some(access)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}
