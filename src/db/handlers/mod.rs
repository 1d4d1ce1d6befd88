//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` and exposes the operations the
//! rest of the crate needs for one table. Handlers construct a repository per
//! request from a pool connection; the repositories never hold the pool
//! themselves, which keeps transaction control in the caller's hands.

pub mod api_tokens;
pub mod repository;
pub mod users;
