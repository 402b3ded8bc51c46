//! Application services and the store contracts they depend on.

pub mod categories;
pub mod error;
pub mod pagination;
pub mod repos;
pub mod users;
