//! API handlers organized by resource type.
//!
//! Extraction helpers and error conversions shared by the resource modules
//! live here.

mod cache;
mod categories;
mod health;
mod users;

pub use cache::*;
pub use categories::*;
pub use health::*;
pub use users::*;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::StatusCode;

use crate::application::categories::CategoryServiceError;
use crate::application::pagination::PageRequest;
use crate::application::repos::RepoError;
use crate::application::users::UserServiceError;
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};
use super::models::PageQuery;

// ----- Extraction helpers -----

pub(crate) fn page_request(
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<PageRequest, ApiError> {
    let Query(query) = query
        .map_err(|err| ApiError::bad_request("invalid query string", Some(err.body_text())))?;
    PageRequest::from_query(query.page, query.limit)
        .map_err(|err| ApiError::bad_request("invalid pagination", Some(err.to_string())))
}

pub(crate) fn path_value<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    path.map(|Path(value)| value)
        .map_err(|err| ApiError::bad_request("invalid path parameter", Some(err.body_text())))
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|err| ApiError::bad_request("invalid request body", Some(err.body_text())))
}

// ----- Shared error conversions -----

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::CONFLICT,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::ForeignKey { constraint } => ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::INVALID_REFERENCE,
            "Referenced record does not exist",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

fn validation_to_api(err: DomainError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        codes::VALIDATION,
        "Validation failed",
        Some(err.to_string()),
    )
}

fn conflict(field: &'static str) -> ApiError {
    ApiError::new(
        StatusCode::CONFLICT,
        codes::CONFLICT,
        "Resource already exists",
        Some(format!("`{field}` is already in use")),
    )
}

pub(crate) fn user_to_api(err: UserServiceError) -> ApiError {
    match err {
        UserServiceError::NotFound => ApiError::not_found("user not found"),
        UserServiceError::Conflict { field } => conflict(field),
        UserServiceError::InvalidReference { field } => ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::INVALID_REFERENCE,
            "Referenced category does not exist",
            Some(field.to_string()),
        ),
        UserServiceError::Validation(domain) => validation_to_api(domain),
        UserServiceError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn category_to_api(err: CategoryServiceError) -> ApiError {
    match err {
        CategoryServiceError::NotFound => ApiError::not_found("category not found"),
        CategoryServiceError::Conflict { field } => conflict(field),
        CategoryServiceError::Validation(domain) => validation_to_api(domain),
        CategoryServiceError::Repo(repo) => repo_to_api(repo),
    }
}
