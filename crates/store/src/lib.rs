//! Trạm Sách store - database access and domain services.
//!
//! Shared by the `storefront` and `admin` binaries, which both operate on
//! the same `SQLite` database.
//!
//! # Modules
//!
//! - [`db`] - Connection pool, embedded migrations and repositories
//! - [`models`] - Domain models returned by repositories and services
//! - [`services`] - Cart, checkout, bulk import, webhook notification and
//!   password authentication

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod db;
pub mod models;
pub mod services;

pub use db::{RepositoryError, create_pool, migrate};
