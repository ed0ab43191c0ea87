use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{Body, to_bytes};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use knotlist_infra::auth::decode_jwt_claim;
use knotlist_infra::config::AppConfig;

use crate::observability;
use crate::routes;
use crate::state::AppState;

fn test_config() -> AppConfig {
    AppConfig {
        app_env: "test".to_string(),
        port: 0,
        log_level: "info".to_string(),
        graph_backend: "embedded".to_string(),
        // port 1 is never listening; embedded mode must not care
        surreal_endpoint: "ws://127.0.0.1:1".to_string(),
        surreal_ns: "knotlist".to_string(),
        surreal_db: "todos".to_string(),
        surreal_user: "root".to_string(),
        surreal_pass: "root".to_string(),
        jwt_secret: "test-secret".to_string(),
        oidc_client_id: "knotlist-test".to_string(),
        oidc_secret: "test-oidc-secret".to_string(),
        oidc_discovery_uri: "https://accounts.example.com/.well-known/openid-configuration"
            .to_string(),
    }
}

fn test_token(secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_secs();
    let claims = json!({
        "sub": "user-123",
        "email": "user-123@example.com",
        "name": "Test User",
        "exp": now + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token")
}

async fn test_app() -> axum::Router {
    let state = AppState::new(test_config()).await.expect("state");
    routes::router(state)
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn put_todos_request(token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/api/todos")
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn guid_set(todos: &Value) -> HashSet<String> {
    todos
        .as_array()
        .expect("array")
        .iter()
        .map(|todo| todo["guid"].as_str().expect("guid").to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_the_embedded_backend() {
    let app = test_app().await;
    let response = app.oneshot(get_request("/health", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "embedded");
    // the bogus remote endpoint in test_config must not matter
    assert_eq!(body["backend_reachable"], true);
}

#[tokio::test]
async fn root_redirects_to_the_public_page() {
    let app = test_app().await;
    let response = app.oneshot(get_request("/", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).expect("location"),
        "/public"
    );
}

#[tokio::test]
async fn public_page_counts_without_authentication() {
    let app = test_app().await;
    let response = app
        .clone()
        .oneshot(get_request("/public", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Knotlist");
    assert_eq!(body["total"], 0);

    let response = app
        .oneshot(get_request("/public?name=Ada", None))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body["name"], "Ada");
}

#[tokio::test]
async fn todo_routes_require_authentication() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(get_request("/api/todos", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get_request("/api/todos", Some("not-a-token")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("PUT")
        .uri("/api/todos")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("[]"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_store_lists_nothing() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let response = app
        .oneshot(get_request("/api/todos", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn replace_then_list_round_trips() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let todos = json!([{ "guid": "t1", "title": "Buy milk", "completed": false }]);
    let response = app
        .clone()
        .oneshot(put_todos_request(&token, &todos))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/todos", Some(&token)))
        .await
        .expect("response");
    assert_eq!(body_json(response).await, todos);
}

#[tokio::test]
async fn resubmitting_a_guid_upserts_in_place() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let first = json!([{ "guid": "t1", "title": "A", "completed": false }]);
    let second = json!([{ "guid": "t1", "title": "B", "completed": true }]);
    for todos in [&first, &second] {
        let response = app
            .clone()
            .oneshot(put_todos_request(&token, todos))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(get_request("/api/todos", Some(&token)))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(body, second);
}

#[tokio::test]
async fn full_replace_clears_stale_records() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let seed = json!([
        { "guid": "t1", "title": "one", "completed": false },
        { "guid": "t2", "title": "two", "completed": false },
        { "guid": "t3", "title": "three", "completed": true },
    ]);
    app.clone()
        .oneshot(put_todos_request(&token, &seed))
        .await
        .expect("response");

    let replacement = json!([{ "guid": "t4", "title": "four", "completed": false }]);
    app.clone()
        .oneshot(put_todos_request(&token, &replacement))
        .await
        .expect("response");

    let response = app
        .oneshot(get_request("/api/todos", Some(&token)))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(guid_set(&body), HashSet::from(["t4".to_string()]));
}

#[tokio::test]
async fn listing_is_idempotent_between_writes() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let todos = json!([
        { "guid": "t1", "title": "one", "completed": false },
        { "guid": "t2", "title": "two", "completed": true },
    ]);
    app.clone()
        .oneshot(put_todos_request(&token, &todos))
        .await
        .expect("response");

    let first = body_json(
        app.clone()
            .oneshot(get_request("/api/todos", Some(&token)))
            .await
            .expect("response"),
    )
    .await;
    let second = body_json(
        app.oneshot(get_request("/api/todos", Some(&token)))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(guid_set(&first), guid_set(&second));
}

#[tokio::test]
async fn items_without_a_guid_are_skipped_not_fatal() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let todos = json!([
        { "guid": "", "title": "no key", "completed": false },
        { "guid": "t9", "title": "kept", "completed": false },
    ]);
    let response = app
        .clone()
        .oneshot(put_todos_request(&token, &todos))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/todos", Some(&token)))
        .await
        .expect("response");
    let body = body_json(response).await;
    assert_eq!(guid_set(&body), HashSet::from(["t9".to_string()]));
}

#[tokio::test]
async fn oversized_titles_are_rejected() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let todos = json!([{ "guid": "t1", "title": "x".repeat(201), "completed": false }]);
    let response = app
        .oneshot(put_todos_request(&token, &todos))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generated_tokens_never_carry_the_reserved_claim() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let response = app
        .oneshot(get_request("/generate-token", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let issued = body_text(response).await;
    assert!(decode_jwt_claim(&issued, "sub").is_none());
    assert_eq!(
        decode_jwt_claim(&issued, "email"),
        Some(json!("user-123@example.com"))
    );
}

#[tokio::test]
async fn private_page_exposes_profile_and_token() {
    let app = test_app().await;
    let token = test_token("test-secret");

    let response = app
        .oneshot(get_request("/private?name=Ada", Some(&token)))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["total"], 0);
    // the displayed profile keeps its subject; only the token is sanitized
    assert_eq!(body["profile"]["sub"], "user-123");
    let issued = body["token"].as_str().expect("token");
    assert!(decode_jwt_claim(issued, "sub").is_none());
}

#[tokio::test]
async fn auth_config_never_exposes_the_client_secret() {
    let app = test_app().await;
    let response = app
        .oneshot(get_request("/auth/config", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("knotlist-test"));
    assert!(body.contains("accounts.example.com"));
    assert!(!body.contains("test-oidc-secret"));
}

#[tokio::test]
async fn metrics_endpoint_renders_after_init() {
    let _ = observability::init_metrics();
    let app = test_app().await;
    let response = app
        .oneshot(get_request("/metrics", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_backend_mode_fails_startup() {
    let mut config = test_config();
    config.graph_backend = "both".to_string();
    assert!(AppState::new(config).await.is_err());
}

#[tokio::test]
async fn empty_signing_secret_fails_startup() {
    let mut config = test_config();
    config.jwt_secret = String::new();
    assert!(AppState::new(config).await.is_err());
}
