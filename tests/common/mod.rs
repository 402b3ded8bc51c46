#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use userdir::application::categories::CategoryService;
use userdir::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, CreateUserParams, RepoError,
    StoreHealth, UpdateCategoryParams, UpdateUserParams, UsersRepo, UsersWriteRepo,
};
use userdir::application::users::UserService;
use userdir::cache::{
    CacheBackend, CacheClient, CacheConfig, CacheError, CacheKey, InvalidationPattern,
    MemoryBackend,
};
use userdir::domain::entities::{CategoryRecord, UserRecord};

/// Store double with the same constraints as the schema: unique email and
/// category name, category references checked, category delete nulls them.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<Vec<(UserRecord, String)>>,
    categories: Mutex<Vec<CategoryRecord>>,
    pub user_reads: AtomicUsize,
    pub user_list_reads: AtomicUsize,
    pub category_reads: AtomicUsize,
    pub category_list_reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    pub fn user_list_reads(&self) -> usize {
        self.user_list_reads.load(Ordering::SeqCst)
    }

    pub fn category_reads(&self) -> usize {
        self.category_reads.load(Ordering::SeqCst)
    }

    pub fn category_list_reads(&self) -> usize {
        self.category_list_reads.load(Ordering::SeqCst)
    }

    pub fn stored_password(&self, id: Uuid) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(_, password)| password.clone())
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }

    fn page<T: Clone>(rows: &[T], limit: u32, offset: u64) -> Vec<T> {
        rows.iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    fn category_exists(&self, id: Uuid) -> bool {
        self.categories
            .lock()
            .unwrap()
            .iter()
            .any(|category| category.id == id)
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        self.check()?;
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(user, _)| user.email == email)
            .map(|(user, _)| user.clone()))
    }

    async fn list_users(&self, limit: u32, offset: u64) -> Result<Vec<UserRecord>, RepoError> {
        self.check()?;
        self.user_list_reads.fetch_add(1, Ordering::SeqCst);
        let users: Vec<UserRecord> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|(user, _)| user.clone())
            .collect();
        Ok(Self::page(&users, limit, offset))
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        self.check()?;
        Ok(self.users.lock().unwrap().len() as u64)
    }

    async fn list_by_category(
        &self,
        category_id: Uuid,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<UserRecord>, RepoError> {
        self.check()?;
        self.user_list_reads.fetch_add(1, Ordering::SeqCst);
        let users: Vec<UserRecord> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| user.category_user_id == Some(category_id))
            .map(|(user, _)| user.clone())
            .collect();
        Ok(Self::page(&users, limit, offset))
    }

    async fn count_by_category(&self, category_id: Uuid) -> Result<u64, RepoError> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(user, _)| user.category_user_id == Some(category_id))
            .count() as u64)
    }
}

#[async_trait]
impl UsersWriteRepo for InMemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        self.check()?;
        if let Some(category_id) = params.category_user_id {
            if !self.category_exists(category_id) {
                return Err(RepoError::ForeignKey {
                    constraint: "users_category_user_id_fkey".into(),
                });
            }
        }
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(user, _)| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".into(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: Uuid::new_v4(),
            name: params.name,
            email: params.email,
            category_user_id: params.category_user_id,
            created_at: now,
            updated_at: now,
        };
        users.push((user.clone(), params.password));
        Ok(user)
    }

    async fn update_user(
        &self,
        params: UpdateUserParams,
    ) -> Result<Option<UserRecord>, RepoError> {
        self.check()?;
        if let Some(Some(category_id)) = params.category_user_id.as_set() {
            if !self.category_exists(*category_id) {
                return Err(RepoError::ForeignKey {
                    constraint: "users_category_user_id_fkey".into(),
                });
            }
        }
        let mut users = self.users.lock().unwrap();
        if let Some(email) = params.email.as_set() {
            if users
                .iter()
                .any(|(user, _)| user.email == *email && user.id != params.id)
            {
                return Err(RepoError::Duplicate {
                    constraint: "users_email_key".into(),
                });
            }
        }
        let Some((user, password)) = users.iter_mut().find(|(user, _)| user.id == params.id)
        else {
            return Ok(None);
        };
        user.name = params.name.apply(user.name.clone());
        user.email = params.email.apply(user.email.clone());
        user.category_user_id = params.category_user_id.apply(user.category_user_id);
        *password = params.password.apply(password.clone());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|(user, _)| user.id != id);
        Ok(users.len() < before)
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        self.check()?;
        self.category_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRecord>, RepoError> {
        self.check()?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|category| category.name == name)
            .cloned())
    }

    async fn list_categories(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        self.check()?;
        self.category_list_reads.fetch_add(1, Ordering::SeqCst);
        let categories = self.categories.lock().unwrap().clone();
        Ok(Self::page(&categories, limit, offset))
    }

    async fn count_categories(&self) -> Result<u64, RepoError> {
        self.check()?;
        Ok(self.categories.lock().unwrap().len() as u64)
    }
}

#[async_trait]
impl CategoriesWriteRepo for InMemoryStore {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        self.check()?;
        let mut categories = self.categories.lock().unwrap();
        if categories
            .iter()
            .any(|category| category.name == params.name)
        {
            return Err(RepoError::Duplicate {
                constraint: "category_users_name_key".into(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            description: params.description,
            created_at: now,
            updated_at: now,
        };
        categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        self.check()?;
        let mut categories = self.categories.lock().unwrap();
        if let Some(name) = params.name.as_set() {
            if categories
                .iter()
                .any(|category| category.name == *name && category.id != params.id)
            {
                return Err(RepoError::Duplicate {
                    constraint: "category_users_name_key".into(),
                });
            }
        }
        let Some(category) = categories
            .iter_mut()
            .find(|category| category.id == params.id)
        else {
            return Ok(None);
        };
        category.name = params.name.apply(category.name.clone());
        category.description = params.description.apply(category.description.clone());
        category.updated_at = OffsetDateTime::now_utc();
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check()?;
        let removed = {
            let mut categories = self.categories.lock().unwrap();
            let before = categories.len();
            categories.retain(|category| category.id != id);
            categories.len() < before
        };
        if removed {
            for (user, _) in self.users.lock().unwrap().iter_mut() {
                if user.category_user_id == Some(id) {
                    user.category_user_id = None;
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        self.check()
    }
}

/// Every operation fails, as if the cache server were unreachable.
pub struct FailingBackend;

#[async_trait]
impl CacheBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &CacheKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(
        &self,
        _key: &CacheKey,
        _payload: String,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &CacheKey) -> Result<bool, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_matching(&self, _pattern: &InvalidationPattern) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: CacheClient,
    pub users: UserService,
    pub categories: CategoryService,
}

impl Harness {
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let cache = CacheClient::new(backend, &CacheConfig::default());
        let users = UserService::new(
            store.clone() as Arc<dyn UsersRepo>,
            store.clone() as Arc<dyn UsersWriteRepo>,
            store.clone() as Arc<dyn CategoriesRepo>,
            cache.clone(),
        );
        let categories = CategoryService::new(
            store.clone() as Arc<dyn CategoriesRepo>,
            store.clone() as Arc<dyn CategoriesWriteRepo>,
            cache.clone(),
        );
        Self {
            store,
            cache,
            users,
            categories,
        }
    }

    pub fn with_memory() -> (Self, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(
            std::num::NonZeroUsize::new(1_024).expect("non-zero capacity"),
        ));
        (Self::with_backend(backend.clone()), backend)
    }

    pub fn failing() -> Self {
        Self::with_backend(Arc::new(FailingBackend))
    }
}
