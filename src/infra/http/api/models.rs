use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{EntityKind, FieldUpdate};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub category_user_id: Option<Uuid>,
}

/// Absent keys leave the column untouched; `"categoryUserId": null` detaches
/// the user from its category.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdateRequest {
    pub name: FieldUpdate<String>,
    pub email: FieldUpdate<String>,
    pub password: FieldUpdate<String>,
    pub category_user_id: FieldUpdate<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryUpdateRequest {
    pub name: FieldUpdate<String>,
    pub description: FieldUpdate<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CacheFlushResponse {
    pub message: &'static str,
    pub backend: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CacheInvalidateResponse {
    pub kind: EntityKind,
    pub removed: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
