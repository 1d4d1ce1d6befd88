//! Database models for static API tokens.

use crate::types::ApiTokenId;
use chrono::{DateTime, Utc};

/// Database request for creating a new API token
#[derive(Debug, Clone)]
pub struct ApiTokenCreateDBRequest {
    pub token: String,
    pub username: String,
    pub description: Option<String>,
    pub is_admin: bool,
    pub is_moderator: bool,
}

/// Database response for an API token
#[derive(Debug, Clone)]
pub struct ApiTokenDBResponse {
    pub id: ApiTokenId,
    pub token: String,
    pub username: String,
    pub description: Option<String>,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
