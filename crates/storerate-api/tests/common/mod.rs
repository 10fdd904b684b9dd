//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use sqlx::PgPool;
use storerate_core::clock::Clock;
use storerate_core::model::Role;
use storerate_core::retry::RetryPolicy;
use storerate_persistence::{Argon2CredentialHasher, PgEntityStore, PgIdentityProvider};
use storerate_test_support::FixedClock;
use tower::ServiceExt;
use uuid::Uuid;

use storerate_api::app;
use storerate_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over PostgreSQL, with the same routes as
/// `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    let clock = fixed_clock();
    let app_state = AppState::new(
        Arc::new(PgEntityStore::new(pool.clone())),
        Arc::new(PgIdentityProvider::new(pool, Arc::clone(&clock))),
        Arc::new(Argon2CredentialHasher),
        clock,
        RetryPolicy::default(),
    );
    app(app_state)
}

/// A user row plus a bearer token for it.
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

/// Insert a user directly and issue them a token valid for an hour.
pub async fn seed_user(pool: &PgPool, name: &str, role: Role) -> TestUser {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, address, role) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(name)
        .bind(format!("{}@mail.com", id.simple()))
        .bind("1 Test Street")
        .bind(role.as_str())
        .execute(pool)
        .await
        .unwrap();

    let issued = PgIdentityProvider::new(pool.clone(), fixed_clock())
        .issue_token(id, Duration::hours(1))
        .await
        .unwrap();

    TestUser {
        id,
        token: issued.token,
    }
}

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(token), Some(body)).await
}

/// Send a PUT request with a JSON body and return the response.
pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "PUT", uri, Some(token), Some(body)).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, token, None).await
}

/// Send a DELETE request and return the response.
pub async fn delete_json(app: Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    send(app, "DELETE", uri, Some(token), None).await
}
