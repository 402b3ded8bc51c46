//! User directory service: users and their categories served from Postgres
//! through a read-through, write-invalidated cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
