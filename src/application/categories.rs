use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, RepoError, UpdateCategoryParams,
};
use crate::cache::{CacheClient, InvalidationPlan, WriteOp, list_key, single_key};
use crate::domain::entities::CategoryRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{EntityKind, FieldUpdate};
use crate::domain::validation::{normalize_description, normalize_name};

const KIND: EntityKind = EntityKind::Category;

#[derive(Debug, Error)]
pub enum CategoryServiceError {
    #[error("category not found")]
    NotFound,
    #[error("`{field}` is already in use")]
    Conflict { field: &'static str },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateCategoryCommand {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryCommand {
    pub id: Uuid,
    pub name: FieldUpdate<String>,
    pub description: FieldUpdate<Option<String>>,
}

#[derive(Clone)]
pub struct CategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    cache: CacheClient,
}

impl CategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        cache: CacheClient,
    ) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn list(
        &self,
        page: PageRequest,
    ) -> Result<Page<CategoryRecord>, CategoryServiceError> {
        let key = list_key(KIND, page.page(), page.limit());
        self.cache
            .get_or_fetch(&key, self.cache.list_ttl(), || async {
                let (rows, total) = tokio::try_join!(
                    self.reader.list_categories(page.limit(), page.offset()),
                    self.reader.count_categories(),
                )?;
                Ok::<_, CategoryServiceError>(Page::new(rows, page, total))
            })
            .await
    }

    pub async fn get_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<CategoryRecord>, CategoryServiceError> {
        let key = single_key(KIND, id);
        self.cache
            .get_or_load(&key, self.cache.single_ttl(), || async {
                Ok::<_, CategoryServiceError>(self.reader.find_by_id(id).await?)
            })
            .await
    }

    /// Uncached; backs the name uniqueness check.
    pub async fn get_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, CategoryServiceError> {
        Ok(self.reader.find_by_name(name.trim()).await?)
    }

    pub async fn create(
        &self,
        command: CreateCategoryCommand,
    ) -> Result<CategoryRecord, CategoryServiceError> {
        let name = normalize_name(&command.name, "name")?;
        let description = normalize_description(command.description);

        if self.reader.find_by_name(&name).await?.is_some() {
            return Err(CategoryServiceError::Conflict { field: "name" });
        }

        let category = self
            .writer
            .create_category(CreateCategoryParams { name, description })
            .await
            .map_err(map_write_error)?;

        self.invalidate(WriteOp::Create).await;
        info!(
            target = "application::categories::create",
            category_id = %category.id,
            "category created"
        );
        Ok(category)
    }

    pub async fn update(
        &self,
        command: UpdateCategoryCommand,
    ) -> Result<Option<CategoryRecord>, CategoryServiceError> {
        let current = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(CategoryServiceError::NotFound)?;

        let name = match command.name {
            FieldUpdate::Set(name) => FieldUpdate::Set(normalize_name(&name, "name")?),
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
        };
        let description = command.description.map(normalize_description);

        if let Some(name) = name.as_set().filter(|name| **name != current.name) {
            let holder = self.reader.find_by_name(name).await?;
            if holder.is_some_and(|holder| holder.id != current.id) {
                return Err(CategoryServiceError::Conflict { field: "name" });
            }
        }

        let updated = self
            .writer
            .update_category(UpdateCategoryParams {
                id: command.id,
                name,
                description,
            })
            .await
            .map_err(map_write_error)?;

        if updated.is_some() {
            self.invalidate(WriteOp::Update(command.id)).await;
            info!(
                target = "application::categories::update",
                category_id = %command.id,
                "category updated"
            );
        }
        Ok(updated)
    }

    /// Users that referenced the category keep existing with the reference
    /// cleared, so their cached entries are dropped as well.
    pub async fn delete(&self, id: Uuid) -> Result<bool, CategoryServiceError> {
        if self.reader.find_by_id(id).await?.is_none() {
            return Err(CategoryServiceError::NotFound);
        }

        let deleted = self.writer.delete_category(id).await?;
        if deleted {
            let removed = self.invalidate(WriteOp::Delete(id)).await;
            info!(
                target = "application::categories::delete",
                category_id = %id,
                invalidated = removed,
                "category deleted"
            );
        }
        Ok(deleted)
    }

    async fn invalidate(&self, op: WriteOp) -> u64 {
        let removed = self
            .cache
            .apply(&InvalidationPlan::for_write(KIND, op))
            .await;
        debug!(
            target = "application::categories::invalidate",
            op = op.as_str(),
            removed,
            "cache entries invalidated"
        );
        removed
    }
}

fn map_write_error(err: RepoError) -> CategoryServiceError {
    match err {
        RepoError::Duplicate { .. } => CategoryServiceError::Conflict { field: "name" },
        other => CategoryServiceError::Repo(other),
    }
}
