//! Database record models matching table schemas.
//!
//! These structs correspond directly to database table rows and are used by
//! repositories to accept insertion/update data and return query results.
//! They are deliberately distinct from the API models in [`crate::api::models`]
//! so the storage and API representations can evolve independently.

pub mod api_tokens;
pub mod users;
