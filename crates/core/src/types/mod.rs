//! Core types for Trạm Sách.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod order_number;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Vnd;
pub use order_number::OrderNumber;
pub use slug::{is_valid_slug, slugify};
pub use status::*;
