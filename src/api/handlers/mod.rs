//! HTTP request handlers.
//!
//! Handlers stay thin: extract, call into [`crate::auth::accounts`] or a
//! repository, convert to an API model. Authorization is not re-checked
//! here; the router attaches the guards from
//! [`crate::auth::middleware`] per route group.

pub mod api_tokens;
pub mod auth;
pub mod users;
