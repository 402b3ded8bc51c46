pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users/email/{email}", get(handlers::get_user_by_email))
        .route(
            "/category-users",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/category-users/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/category-users/{id}/users",
            get(handlers::list_category_users),
        )
        .route(
            "/category-users/name/{name}",
            get(handlers::get_category_by_name),
        )
        .route("/admin/cache", delete(handlers::flush_cache))
        .route("/admin/cache/{kind}", delete(handlers::invalidate_cache_kind))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
