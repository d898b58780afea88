#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use campus_api::auth::jwt::{generate_access_token, JwtConfig};
use campus_api::config::{RsvpConfig, ServerConfig};
use campus_api::router::build_app_router;
use campus_api::state::AppState;
use campus_core::roles::ROLE_MEMBER;
use campus_core::types::DbId;
use campus_db::models::event::{CreateEvent, Event};
use campus_db::models::user::CreateUser;
use campus_db::repositories::{EventRepo, UserRepo};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "campus-integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
        rsvp: RsvpConfig::default(),
    }
}

/// Build the full application router, with every middleware layer
/// production uses, over the given pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState::new(pool, config.clone());
    build_app_router(state, &config)
}

/// Mint an access token signed with the test secret.
pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

/// Insert a user and return a member token for them.
pub async fn member(pool: &PgPool, username: &str) -> (DbId, String) {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@campus.test"),
        },
    )
    .await
    .unwrap();
    (user.id, token_for(user.id, ROLE_MEMBER))
}

/// Insert an event directly, bypassing the API.
pub async fn seed_event(pool: &PgPool, capacity: i32, created_by: Option<DbId>) -> Event {
    EventRepo::create(
        pool,
        &CreateEvent {
            title: "Open mic".to_string(),
            description: Some("Bring an instrument".to_string()),
            location: Some("Quad".to_string()),
            starts_at: None,
            capacity,
        },
        created_by,
    )
    .await
    .unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    json: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(json)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    json: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(json)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
