//! User handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::users::{CreateUserCommand, UpdateUserCommand};

use super::{json_body, page_request, path_value, user_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_users(
    State(state): State<ApiState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request(query)?;
    let users = state.users.list(page).await.map_err(user_to_api)?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let user = state.users.get_by_id(id).await.map_err(user_to_api)?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("user not found")),
    }
}

pub async fn get_user_by_email(
    State(state): State<ApiState>,
    email: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let email = path_value(email)?;
    let user = state
        .users
        .get_by_email(&email)
        .await
        .map_err(user_to_api)?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("user not found")),
    }
}

pub async fn create_user(
    State(state): State<ApiState>,
    payload: Result<Json<UserCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let command = CreateUserCommand {
        name: payload.name,
        email: payload.email,
        password: payload.password,
        category_user_id: payload.category_user_id,
    };

    let user = state.users.create(command).await.map_err(user_to_api)?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let payload = json_body(payload)?;
    let command = UpdateUserCommand {
        id,
        name: payload.name,
        email: payload.email,
        password: payload.password,
        category_user_id: payload.category_user_id,
    };

    let user = state.users.update(command).await.map_err(user_to_api)?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found("user not found")),
    }
}

pub async fn delete_user(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let removed = state.users.delete(id).await.map_err(user_to_api)?;

    if !removed {
        return Err(ApiError::not_found("user not found"));
    }
    Ok(Json(MessageResponse {
        message: "user deleted successfully",
    }))
}
