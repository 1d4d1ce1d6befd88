//! Wire models for the HTTP API.
//!
//! Field names are camelCase on the wire. Conversions from the DB models in
//! [`crate::db::models`] live here, so handlers never serialize a storage
//! struct directly.

pub mod api_tokens;
pub mod auth;
pub mod users;
