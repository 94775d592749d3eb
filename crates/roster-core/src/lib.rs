//! # Roster Core
//!
//! Core types, errors, and utilities for the Roster API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Page-based pagination
//! - [`order`]: `order_by` query parsing
//! - [`password`]: Password hashing and verification
//!
//! # Example
//!
//! ```ignore
//! use roster_core::errors::AppError;
//! use roster_core::pagination::Page;
//!
//! let error = AppError::not_found(anyhow::anyhow!("user not found"));
//! let page = Page::parse(Some("1"), Some("10"))?;
//! ```

pub mod errors;
pub mod order;
pub mod pagination;
pub mod password;

pub use errors::{AppError, FieldErrors, INTERNAL_MESSAGE};
pub use order::{Direction, OrderBy, OrderByError, OrderField};
pub use pagination::{Page, PageError, PageResult};
pub use password::{hash_password, hash_password_with_cost, verify_password};
