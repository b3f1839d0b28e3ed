//! Trạm Sách Core - Shared types library.
//!
//! This crate provides common types used across all Trạm Sách components:
//! - `store` - Database access and domain services (cart, checkout, import, webhook)
//! - `storefront` - Public-facing bookstore API
//! - `admin` - Back-office API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, order
//!   numbers, slugs and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
