use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CategoriesRepo, CreateUserParams, RepoError, UpdateUserParams, UsersRepo, UsersWriteRepo,
};
use crate::cache::{
    CacheClient, InvalidationPlan, WriteOp, category_members_key, list_key, single_key,
};
use crate::domain::entities::UserRecord;
use crate::domain::error::DomainError;
use crate::domain::types::{EntityKind, FieldUpdate};
use crate::domain::validation::{ensure_password, normalize_email, normalize_name};

const KIND: EntityKind = EntityKind::User;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("user not found")]
    NotFound,
    #[error("`{field}` is already in use")]
    Conflict { field: &'static str },
    #[error("`{field}` does not reference an existing category")]
    InvalidReference { field: &'static str },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub name: String,
    pub email: String,
    pub password: String,
    pub category_user_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdateUserCommand {
    pub id: Uuid,
    pub name: FieldUpdate<String>,
    pub email: FieldUpdate<String>,
    pub password: FieldUpdate<String>,
    pub category_user_id: FieldUpdate<Option<Uuid>>,
}

/// Users with read-through caching in front of the store.
///
/// Lookups by email always go to the store: they back the uniqueness check
/// and must see the latest committed row.
#[derive(Clone)]
pub struct UserService {
    reader: Arc<dyn UsersRepo>,
    writer: Arc<dyn UsersWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    cache: CacheClient,
}

impl UserService {
    pub fn new(
        reader: Arc<dyn UsersRepo>,
        writer: Arc<dyn UsersWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        cache: CacheClient,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            cache,
        }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<UserRecord>, UserServiceError> {
        let key = list_key(KIND, page.page(), page.limit());
        self.cache
            .get_or_fetch(&key, self.cache.list_ttl(), || async {
                let (rows, total) = tokio::try_join!(
                    self.reader.list_users(page.limit(), page.offset()),
                    self.reader.count_users(),
                )?;
                Ok::<_, UserServiceError>(Page::new(rows, page, total))
            })
            .await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, UserServiceError> {
        let key = single_key(KIND, id);
        self.cache
            .get_or_load(&key, self.cache.single_ttl(), || async {
                Ok::<_, UserServiceError>(self.reader.find_by_id(id).await?)
            })
            .await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserServiceError> {
        Ok(self.reader.find_by_email(email.trim()).await?)
    }

    pub async fn list_by_category(
        &self,
        category_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<UserRecord>, UserServiceError> {
        let key = category_members_key(category_id, page.page(), page.limit());
        self.cache
            .get_or_fetch(&key, self.cache.list_ttl(), || async {
                let (rows, total) = tokio::try_join!(
                    self.reader
                        .list_by_category(category_id, page.limit(), page.offset()),
                    self.reader.count_by_category(category_id),
                )?;
                Ok::<_, UserServiceError>(Page::new(rows, page, total))
            })
            .await
    }

    pub async fn create(&self, command: CreateUserCommand) -> Result<UserRecord, UserServiceError> {
        let name = normalize_name(&command.name, "name")?;
        let email = normalize_email(&command.email)?;
        ensure_password(&command.password)?;

        if self.reader.find_by_email(&email).await?.is_some() {
            return Err(UserServiceError::Conflict { field: "email" });
        }
        if let Some(category_id) = command.category_user_id {
            self.ensure_category_exists(category_id).await?;
        }

        let user = self
            .writer
            .create_user(CreateUserParams {
                name,
                email,
                password: command.password,
                category_user_id: command.category_user_id,
            })
            .await
            .map_err(map_write_error)?;

        self.invalidate(WriteOp::Create).await;
        info!(
            target = "application::users::create",
            user_id = %user.id,
            "user created"
        );
        Ok(user)
    }

    /// `Ok(None)` means the row disappeared between the existence check and
    /// the write.
    pub async fn update(
        &self,
        command: UpdateUserCommand,
    ) -> Result<Option<UserRecord>, UserServiceError> {
        let current = self
            .reader
            .find_by_id(command.id)
            .await?
            .ok_or(UserServiceError::NotFound)?;

        let name = match command.name {
            FieldUpdate::Set(name) => FieldUpdate::Set(normalize_name(&name, "name")?),
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
        };
        let email = match command.email {
            FieldUpdate::Set(email) => FieldUpdate::Set(normalize_email(&email)?),
            FieldUpdate::Unchanged => FieldUpdate::Unchanged,
        };
        if let Some(password) = command.password.as_set() {
            ensure_password(password)?;
        }

        if let Some(email) = email.as_set().filter(|email| **email != current.email) {
            let holder = self.reader.find_by_email(email).await?;
            if holder.is_some_and(|holder| holder.id != current.id) {
                return Err(UserServiceError::Conflict { field: "email" });
            }
        }
        if let FieldUpdate::Set(Some(category_id)) = command.category_user_id {
            self.ensure_category_exists(category_id).await?;
        }

        let updated = self
            .writer
            .update_user(UpdateUserParams {
                id: command.id,
                name,
                email,
                password: command.password,
                category_user_id: command.category_user_id,
            })
            .await
            .map_err(map_write_error)?;

        if updated.is_some() {
            self.invalidate(WriteOp::Update(command.id)).await;
            info!(
                target = "application::users::update",
                user_id = %command.id,
                "user updated"
            );
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, UserServiceError> {
        if self.reader.find_by_id(id).await?.is_none() {
            return Err(UserServiceError::NotFound);
        }

        let deleted = self.writer.delete_user(id).await?;
        if deleted {
            self.invalidate(WriteOp::Delete(id)).await;
            info!(
                target = "application::users::delete",
                user_id = %id,
                "user deleted"
            );
        }
        Ok(deleted)
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), UserServiceError> {
        match self.categories.find_by_id(category_id).await? {
            Some(_) => Ok(()),
            None => Err(UserServiceError::InvalidReference {
                field: "categoryUserId",
            }),
        }
    }

    async fn invalidate(&self, op: WriteOp) -> u64 {
        let removed = self
            .cache
            .apply(&InvalidationPlan::for_write(KIND, op))
            .await;
        debug!(
            target = "application::users::invalidate",
            op = op.as_str(),
            removed,
            "cache entries invalidated"
        );
        removed
    }
}

/// Store-side constraint violations are authoritative over the pre-checks,
/// which can race with concurrent writers.
fn map_write_error(err: RepoError) -> UserServiceError {
    match err {
        RepoError::Duplicate { .. } => UserServiceError::Conflict { field: "email" },
        RepoError::ForeignKey { .. } => UserServiceError::InvalidReference {
            field: "categoryUserId",
        },
        other => UserServiceError::Repo(other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use super::*;
    use crate::application::repos::CategoriesRepo;
    use crate::domain::entities::CategoryRecord;

    fn user(email: &str) -> UserRecord {
        let now = OffsetDateTime::now_utc();
        UserRecord {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: email.into(),
            category_user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[derive(Default)]
    struct StubUsers {
        existing: Mutex<Option<UserRecord>>,
        reads: AtomicUsize,
        duplicate_on_insert: bool,
    }

    #[async_trait]
    impl UsersRepo for StubUsers {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.existing.lock().unwrap().clone().filter(|u| u.id == id))
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
            Ok(self
                .existing
                .lock()
                .unwrap()
                .clone()
                .filter(|u| u.email == email))
        }

        async fn list_users(&self, _: u32, _: u64) -> Result<Vec<UserRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn count_users(&self) -> Result<u64, RepoError> {
            Ok(0)
        }

        async fn list_by_category(
            &self,
            _: Uuid,
            _: u32,
            _: u64,
        ) -> Result<Vec<UserRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn count_by_category(&self, _: Uuid) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    #[async_trait]
    impl UsersWriteRepo for StubUsers {
        async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
            if self.duplicate_on_insert {
                return Err(RepoError::Duplicate {
                    constraint: "users_email_key".into(),
                });
            }
            let mut record = user(&params.email);
            record.category_user_id = params.category_user_id;
            Ok(record)
        }

        async fn update_user(
            &self,
            params: UpdateUserParams,
        ) -> Result<Option<UserRecord>, RepoError> {
            let mut guard = self.existing.lock().unwrap();
            let Some(current) = guard.as_mut().filter(|u| u.id == params.id) else {
                return Ok(None);
            };
            current.name = params.name.apply(current.name.clone());
            current.email = params.email.apply(current.email.clone());
            Ok(Some(current.clone()))
        }

        async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
            let mut guard = self.existing.lock().unwrap();
            Ok(guard.take_if(|u| u.id == id).is_some())
        }
    }

    struct NoCategories;

    #[async_trait]
    impl CategoriesRepo for NoCategories {
        async fn find_by_id(&self, _: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(None)
        }

        async fn find_by_name(&self, _: &str) -> Result<Option<CategoryRecord>, RepoError> {
            Ok(None)
        }

        async fn list_categories(&self, _: u32, _: u64) -> Result<Vec<CategoryRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn count_categories(&self) -> Result<u64, RepoError> {
            Ok(0)
        }
    }

    fn service(repo: Arc<StubUsers>) -> UserService {
        UserService::new(
            repo.clone(),
            repo,
            Arc::new(NoCategories),
            CacheClient::disabled(),
        )
    }

    fn create_command(email: &str) -> CreateUserCommand {
        CreateUserCommand {
            name: "Ada".into(),
            email: email.into(),
            password: "secret".into(),
            category_user_id: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_taken_email_before_writing() {
        let repo = Arc::new(StubUsers::default());
        *repo.existing.lock().unwrap() = Some(user("a@x.com"));

        let err = service(repo).create(create_command("a@x.com")).await.unwrap_err();

        assert!(matches!(err, UserServiceError::Conflict { field: "email" }));
    }

    #[tokio::test]
    async fn store_side_duplicate_maps_to_conflict() {
        let repo = Arc::new(StubUsers {
            duplicate_on_insert: true,
            ..Default::default()
        });

        let err = service(repo).create(create_command("a@x.com")).await.unwrap_err();

        assert!(matches!(err, UserServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn unknown_category_is_an_invalid_reference() {
        let repo = Arc::new(StubUsers::default());
        let mut command = create_command("a@x.com");
        command.category_user_id = Some(Uuid::new_v4());

        let err = service(repo).create(command).await.unwrap_err();

        assert!(matches!(err, UserServiceError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn invalid_email_is_a_validation_error() {
        let repo = Arc::new(StubUsers::default());

        let err = service(repo).create(create_command("nope")).await.unwrap_err();

        assert!(matches!(err, UserServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_keeping_own_email_is_not_a_conflict() {
        let repo = Arc::new(StubUsers::default());
        let existing = user("a@x.com");
        let id = existing.id;
        *repo.existing.lock().unwrap() = Some(existing);

        let updated = service(repo)
            .update(UpdateUserCommand {
                id,
                name: FieldUpdate::Set("Grace".into()),
                email: FieldUpdate::Set("a@x.com".into()),
                password: FieldUpdate::Unchanged,
                category_user_id: FieldUpdate::Unchanged,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Grace");
        assert_eq!(updated.email, "a@x.com");
    }

    #[tokio::test]
    async fn missing_targets_are_not_found() {
        let repo = Arc::new(StubUsers::default());
        let svc = service(repo);

        assert!(matches!(
            svc.delete(Uuid::new_v4()).await,
            Err(UserServiceError::NotFound)
        ));
        assert!(matches!(
            svc.update(UpdateUserCommand {
                id: Uuid::new_v4(),
                name: FieldUpdate::Unchanged,
                email: FieldUpdate::Unchanged,
                password: FieldUpdate::Unchanged,
                category_user_id: FieldUpdate::Unchanged,
            })
            .await,
            Err(UserServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn disabled_cache_reads_the_store_every_time() {
        let repo = Arc::new(StubUsers::default());
        let existing = user("a@x.com");
        let id = existing.id;
        *repo.existing.lock().unwrap() = Some(existing);
        let svc = service(repo.clone());

        assert!(svc.get_by_id(id).await.unwrap().is_some());
        assert!(svc.get_by_id(id).await.unwrap().is_some());

        assert_eq!(repo.reads.load(Ordering::SeqCst), 2);
    }
}
