//! Database layer: repositories, record models, and error categorization.
//!
//! The layer is split in two:
//! - [`models`] holds the plain structs that mirror table rows,
//! - [`handlers`] holds the repositories that run the actual queries.
//!
//! Errors from sqlx are folded into [`errors::DbError`] so callers can match
//! on the few cases that matter (not found, unique violation) without
//! inspecting driver details.

pub mod errors;
pub mod handlers;
pub mod models;
