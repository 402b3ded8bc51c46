use std::sync::Arc;

use crate::application::categories::CategoryService;
use crate::application::repos::StoreHealth;
use crate::application::users::UserService;
use crate::cache::CacheClient;

#[derive(Clone)]
pub struct ApiState {
    pub users: Arc<UserService>,
    pub categories: Arc<CategoryService>,
    pub cache: CacheClient,
    pub store: Arc<dyn StoreHealth>,
}
