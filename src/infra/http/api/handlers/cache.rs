//! Operational cache busting.

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::cache::CacheError;
use crate::domain::types::EntityKind;

use super::path_value;
use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

fn cache_to_api(err: CacheError) -> ApiError {
    ApiError::new(
        StatusCode::SERVICE_UNAVAILABLE,
        codes::CACHE_UNAVAILABLE,
        "Cache backend unavailable",
        Some(err.to_string()),
    )
}

pub async fn flush_cache(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.cache.flush_all().await.map_err(cache_to_api)?;

    Ok(Json(CacheFlushResponse {
        message: "cache flushed",
        backend: state.cache.backend_name(),
    }))
}

pub async fn invalidate_cache_kind(
    State(state): State<ApiState>,
    kind: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = path_value(kind)?;
    let kind = raw
        .parse::<EntityKind>()
        .map_err(|err| ApiError::bad_request("unknown entity kind", Some(err.to_string())))?;

    let removed = state
        .cache
        .invalidate_kind(kind)
        .await
        .map_err(cache_to_api)?;

    Ok(Json(CacheInvalidateResponse { kind, removed }))
}
