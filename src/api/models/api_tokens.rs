//! API models for the static API-token endpoints.

use crate::db::models::api_tokens::ApiTokenDBResponse;
use crate::types::ApiTokenId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenCreateRequest {
    pub username: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_moderator: Option<bool>,
}

/// Credentials to validate via the open check endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTokenCheckRequest {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTokenRevokeRequest {
    pub username: String,
}

/// An API token as returned on creation and revocation. The token value is
/// included; this is the only place a caller ever sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenResponse {
    pub id: ApiTokenId,
    pub username: String,
    pub token: String,
    pub description: Option<String>,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ApiTokenDBResponse> for ApiTokenResponse {
    fn from(token: ApiTokenDBResponse) -> Self {
        Self {
            id: token.id,
            username: token.username,
            token: token.token,
            description: token.description,
            is_admin: token.is_admin,
            is_moderator: token.is_moderator,
            created_at: token.created_at,
        }
    }
}
