//! Repository traits describing persistence adapters.
//!
//! Reads and writes are split per entity so services can be handed exactly the
//! capabilities they need. None of these calls are cached; caching is layered
//! on top by the services.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CategoryRecord, UserRecord};
use crate::domain::types::FieldUpdate;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("foreign key constraint `{constraint}` violated")]
    ForeignKey { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub password: String,
    pub category_user_id: Option<Uuid>,
}

/// Only `Set` fields are written; everything else keeps its stored value.
#[derive(Debug, Clone)]
pub struct UpdateUserParams {
    pub id: Uuid,
    pub name: FieldUpdate<String>,
    pub email: FieldUpdate<String>,
    pub password: FieldUpdate<String>,
    pub category_user_id: FieldUpdate<Option<Uuid>>,
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub name: FieldUpdate<String>,
    pub description: FieldUpdate<Option<String>>,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    /// Newest first.
    async fn list_users(&self, limit: u32, offset: u64) -> Result<Vec<UserRecord>, RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;

    async fn list_by_category(
        &self,
        category_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<UserRecord>, RepoError>;

    async fn count_by_category(&self, category_id: Uuid) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait UsersWriteRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Returns `None` when the row no longer exists.
    async fn update_user(&self, params: UpdateUserParams)
    -> Result<Option<UserRecord>, RepoError>;

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, RepoError>;

    /// Newest first.
    async fn list_categories(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn count_categories(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    /// Returns `None` when the row no longer exists.
    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError>;

    /// Referencing users keep existing with their category cleared.
    async fn delete_category(&self, id: Uuid) -> Result<bool, RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
