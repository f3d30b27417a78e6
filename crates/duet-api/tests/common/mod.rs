//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use duet_api::extract::OWNER_HEADER;
use duet_api::state::AppState;
use duet_narrator::NarratorPair;
use duet_store::pg_session_repository::PgSessionRepository;
use duet_test_support::{FixedClock, ScriptedNarrator};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

/// Narration every scripted thread-A call returns.
pub const NARRATION_A: &str = "A: rain hammers the tavern roof";
/// Narration every scripted thread-B call returns.
pub const NARRATION_B: &str = "B: a hooded stranger looks up";

/// Build the full app with a real `PgSessionRepository`, scripted narrators
/// and a fixed clock.
pub fn build_test_app(pool: PgPool) -> Router {
    let narrators = NarratorPair::new(
        Arc::new(ScriptedNarrator::replying("flash", NARRATION_A)),
        Arc::new(ScriptedNarrator::replying("pro", NARRATION_B)),
    );
    build_test_app_with(pool, narrators)
}

/// Build the full app with the given narrators.
pub fn build_test_app_with(pool: PgPool, narrators: NarratorPair) -> Router {
    let app_state = AppState::new(
        Arc::new(FixedClock::default_instant()),
        Arc::new(PgSessionRepository::new(pool)),
        narrators,
        Duration::from_secs(5),
    );
    duet_api::app(app_state)
}

/// Insert a user row and return its id.
pub async fn insert_user(pool: &PgPool, handle: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, handle) VALUES ($1, $2)")
        .bind(id)
        .bind(handle)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// A valid create-session body.
pub fn new_session_body() -> serde_json::Value {
    serde_json::json!({
        "character": { "name": "Shadowheart", "class": "cleric", "race": "elf" },
        "attributes": { "strength": 5, "dexterity": 6, "intelligence": 9 },
        "prologue": "A nautiloid crashes near the Chionthar."
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
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

/// Send a POST request with a JSON body as `owner_id`.
pub async fn post_json(
    app: Router,
    uri: &str,
    owner_id: Uuid,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(OWNER_HEADER, owner_id.to_string())
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request as `owner_id`.
pub async fn get_json(app: Router, uri: &str, owner_id: Uuid) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header(OWNER_HEADER, owner_id.to_string())
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

/// Send a DELETE request as `owner_id`.
pub async fn delete(app: Router, uri: &str, owner_id: Uuid) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(OWNER_HEADER, owner_id.to_string())
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
