use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use time::OffsetDateTime;

use crate::infra::http::api::error::{ApiError, codes};
use crate::infra::http::api::models::HealthResponse;
use crate::infra::http::api::state::ApiState;

/// Process liveness plus a store round-trip. The cache backend is named, not
/// probed.
pub async fn health(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    state.store.ping().await.map_err(|err| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STORE_UNAVAILABLE,
            "Database unavailable",
            Some(err.to_string()),
        )
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        database: "ok",
        cache: state.cache.backend_name(),
        timestamp: OffsetDateTime::now_utc(),
    }))
}
