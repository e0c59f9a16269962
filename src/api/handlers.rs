use std::collections::HashMap;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::MaybeUser;
use crate::api::views::{render, IndexTemplate, Nav};
use crate::core::metrics;
use crate::core::redis::RedisStatus;
use crate::core::state::AppState;
use crate::schemas::HealthResponse;

pub(crate) async fn landing(MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    let nav = user.as_ref().map(Nav::for_user).unwrap_or_default();
    render(&IndexTemplate { nav })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut components = HashMap::new();

    let database_ok = match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => {
            components.insert("database".to_string(), "up".to_string());
            true
        }
        Err(err) => {
            components.insert("database".to_string(), format!("down: {err}"));
            false
        }
    };

    // Redis only backs rate limiting, so losing it degrades rather than fails.
    let redis = state.redis().status().await;
    let redis_ok = !matches!(redis, RedisStatus::Down(_));
    components.insert(
        "redis".to_string(),
        match redis {
            RedisStatus::Up => "up".to_string(),
            RedisStatus::Off => "not connected".to_string(),
            RedisStatus::Down(err) => format!("down: {err}"),
        },
    );

    let status = match (database_ok, redis_ok) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    };

    Json(HealthResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        status: status.to_string(),
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => {
            ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::NotFound("Page not found".to_string())
}
