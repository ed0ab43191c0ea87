use axum::extract::{Extension, Query, State};
use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use knotlist_domain::auth::Profile;
use knotlist_domain::todo::Todo;

use crate::middleware::AuthContext;
use crate::{
    error::ApiError, middleware as app_middleware, observability, state::AppState, validation,
};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/private", get(private_page))
        .route("/generate-token", get(generate_token))
        .route("/api/todos", get(list_todos).put(replace_todos))
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/", get(root))
        .route("/public", get(public_page))
        .route("/auth/config", get(auth_config))
        .merge(protected)
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ))
        .layer(middleware::from_fn(app_middleware::metrics_layer));

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    backend: &'static str,
    backend_reachable: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_reachable = match state.graph.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "graph health check failed");
            false
        }
    };
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
        backend: state.graph.backend(),
        backend_reachable,
    })
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => body.into_response(),
        None => ApiError::Internal.into_response(),
    }
}

async fn root() -> Redirect {
    Redirect::temporary("/public")
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    name: Option<String>,
}

impl PageQuery {
    fn name_or_default(self) -> String {
        self.name.unwrap_or_else(|| "Knotlist".to_string())
    }
}

#[derive(Serialize)]
struct PublicPage {
    name: String,
    total: i64,
}

async fn public_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PublicPage>, ApiError> {
    let total = state.todos.count().await?;
    Ok(Json(PublicPage {
        name: query.name_or_default(),
        total,
    }))
}

#[derive(Serialize)]
struct PrivatePage {
    name: String,
    total: i64,
    profile: Profile,
    token: String,
}

async fn private_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PrivatePage>, ApiError> {
    let profile = auth.profile.ok_or(ApiError::Unauthorized)?;
    let token = state.issuer.generate(&profile)?;
    let total = state.todos.count().await?;
    Ok(Json(PrivatePage {
        name: query.name_or_default(),
        total,
        profile,
        token,
    }))
}

async fn generate_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<String, ApiError> {
    let profile = auth.profile.ok_or(ApiError::Unauthorized)?;
    Ok(state.issuer.generate(&profile)?)
}

#[derive(Serialize)]
struct AuthConfigResponse {
    client_id: String,
    discovery_uri: String,
}

/// OpenID bootstrap data for the client application. The client secret
/// stays server-side.
async fn auth_config(State(state): State<AppState>) -> Json<AuthConfigResponse> {
    Json(AuthConfigResponse {
        client_id: state.config.oidc_client_id.clone(),
        discovery_uri: state.config.oidc_discovery_uri.clone(),
    })
}

#[derive(Debug, Deserialize, Validate)]
struct TodoPayload {
    #[validate(length(max = 128))]
    guid: String,
    #[validate(length(max = 200))]
    title: String,
    completed: bool,
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.todos.list().await?;
    Ok(Json(todos))
}

/// The client puts the entire list every time; the store is reconciled by
/// delete-then-recreate rather than individual deletes.
async fn replace_todos(
    State(state): State<AppState>,
    Json(payload): Json<Vec<TodoPayload>>,
) -> Result<StatusCode, ApiError> {
    for item in &payload {
        validation::validate(item)?;
    }
    let todos = payload
        .into_iter()
        .map(|item| Todo {
            guid: item.guid,
            title: item.title,
            completed: item.completed,
        })
        .collect();

    let outcome = state.todos.replace_all(todos).await?;
    if outcome.skipped > 0 {
        tracing::warn!(
            replaced = outcome.replaced,
            skipped = outcome.skipped,
            "replace completed with skipped items"
        );
    }
    Ok(StatusCode::OK)
}
