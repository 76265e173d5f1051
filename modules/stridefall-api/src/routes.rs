use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use stridefall_common::{ClaimError, ClaimRequest};

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/claims", post(submit_claim))
        .route("/api/v1/territories", get(list_territories))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn submit_claim(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ClaimRequest>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(&ClaimError::AuthFailure);
    };
    let user_id = match state.authenticator.resolve_user(token).await {
        Ok(Some(id)) => id,
        Ok(None) => return error_response(&ClaimError::AuthFailure),
        Err(e) => {
            warn!(error = %e, "token resolution failed");
            return error_response(&ClaimError::Persistence(e.to_string()));
        }
    };

    match state.service.process_claim(user_id, &request, Utc::now()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_territories(State(state): State<Arc<AppState>>) -> Response {
    match state.store.load_territories_snapshot().await {
        Ok(territories) => (StatusCode::OK, Json(territories)).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to load territories");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn error_response(error: &ClaimError) -> Response {
    let (status, code) = match error {
        ClaimError::InvalidPath => (StatusCode::BAD_REQUEST, "invalid_path"),
        ClaimError::InvalidDuration => (StatusCode::BAD_REQUEST, "invalid_duration"),
        ClaimError::TerritoryTooSmall { .. } => (StatusCode::BAD_REQUEST, "territory_too_small"),
        ClaimError::AreaTooLarge { .. } => (StatusCode::BAD_REQUEST, "area_too_large"),
        ClaimError::PaceInsufficient { .. } => (StatusCode::BAD_REQUEST, "pace_insufficient"),
        ClaimError::TerritoryProtected => (StatusCode::FORBIDDEN, "territory_protected"),
        ClaimError::ShieldActive => (StatusCode::FORBIDDEN, "shield_active"),
        ClaimError::CooldownActive { .. } => (StatusCode::TOO_MANY_REQUESTS, "cooldown_active"),
        ClaimError::AuthFailure => (StatusCode::UNAUTHORIZED, "auth_failure"),
        ClaimError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
    };
    let mut body = serde_json::json!({
        "code": code,
        "error": error.to_string(),
    });
    if let Some(remaining_ms) = error.cooldown_remaining_ms() {
        body["cooldown"] = serde_json::json!(remaining_ms);
    }
    (status, Json(body)).into_response()
}
