//! Category handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::categories::{CreateCategoryCommand, UpdateCategoryCommand};

use super::{category_to_api, json_body, page_request, path_value, user_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_categories(
    State(state): State<ApiState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let page = page_request(query)?;
    let categories = state
        .categories
        .list(page)
        .await
        .map_err(category_to_api)?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let category = state
        .categories
        .get_by_id(id)
        .await
        .map_err(category_to_api)?;

    match category {
        Some(category) => Ok(Json(category)),
        None => Err(ApiError::not_found("category not found")),
    }
}

pub async fn get_category_by_name(
    State(state): State<ApiState>,
    name: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let name = path_value(name)?;
    let category = state
        .categories
        .get_by_name(&name)
        .await
        .map_err(category_to_api)?;

    match category {
        Some(category) => Ok(Json(category)),
        None => Err(ApiError::not_found("category not found")),
    }
}

pub async fn list_category_users(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let page = page_request(query)?;
    let users = state
        .users
        .list_by_category(id, page)
        .await
        .map_err(user_to_api)?;
    Ok(Json(users))
}

pub async fn create_category(
    State(state): State<ApiState>,
    payload: Result<Json<CategoryCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;
    let command = CreateCategoryCommand {
        name: payload.name,
        description: payload.description,
    };

    let category = state
        .categories
        .create(command)
        .await
        .map_err(category_to_api)?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CategoryUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let payload = json_body(payload)?;
    let command = UpdateCategoryCommand {
        id,
        name: payload.name,
        description: payload.description,
    };

    let category = state
        .categories
        .update(command)
        .await
        .map_err(category_to_api)?;

    match category {
        Some(category) => Ok(Json(category)),
        None => Err(ApiError::not_found("category not found")),
    }
}

pub async fn delete_category(
    State(state): State<ApiState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_value(id)?;
    let removed = state
        .categories
        .delete(id)
        .await
        .map_err(category_to_api)?;

    if !removed {
        return Err(ApiError::not_found("category not found"));
    }
    Ok(Json(MessageResponse {
        message: "category deleted successfully",
    }))
}
