//! Database repository for static API tokens.
//!
//! API tokens are long-lived credentials keyed by username, used by
//! machine clients that cannot hold a browser session. Each username may
//! hold at most one token at a time.

use crate::db::{
    errors::{DbError, Result},
    models::api_tokens::{ApiTokenCreateDBRequest, ApiTokenDBResponse},
};
use crate::types::ApiTokenId;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct ApiToken {
    pub id: ApiTokenId,
    pub token: String,
    pub username: String,
    pub description: Option<String>,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApiToken> for ApiTokenDBResponse {
    fn from(token: ApiToken) -> Self {
        Self {
            id: token.id,
            token: token.token,
            username: token.username,
            description: token.description,
            is_admin: token.is_admin,
            is_moderator: token.is_moderator,
            created_at: token.created_at,
            updated_at: token.updated_at,
        }
    }
}

pub struct ApiTokens<'c> {
    db: &'c mut PgConnection,
}

impl<'c> ApiTokens<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a token for a username that does not already hold one.
    ///
    /// `ON CONFLICT DO NOTHING` makes concurrent creation safe; a missing
    /// returned row means the username already has a token.
    #[instrument(skip(self, request), fields(username = %request.username), err)]
    pub async fn create(&mut self, request: &ApiTokenCreateDBRequest) -> Result<ApiTokenDBResponse> {
        let token = sqlx::query_as::<_, ApiToken>(
            r#"
            INSERT INTO api_tokens (token, username, description, is_admin, is_moderator)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&request.token)
        .bind(&request.username)
        .bind(&request.description)
        .bind(request.is_admin)
        .bind(request.is_moderator)
        .fetch_optional(&mut *self.db)
        .await?;

        match token {
            Some(token) => Ok(ApiTokenDBResponse::from(token)),
            None => Err(DbError::UniqueViolation {
                constraint: Some("api_tokens_username_key".to_string()),
                table: Some("api_tokens".to_string()),
                message: format!("username {} already has a token", request.username),
            }),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_username(&mut self, username: &str) -> Result<Option<ApiTokenDBResponse>> {
        let token = sqlx::query_as::<_, ApiToken>("SELECT * FROM api_tokens WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(token.map(ApiTokenDBResponse::from))
    }

    /// Delete the token held by `username`, returning the deleted record.
    #[instrument(skip(self), err)]
    pub async fn delete_by_username(&mut self, username: &str) -> Result<Option<ApiTokenDBResponse>> {
        let token = sqlx::query_as::<_, ApiToken>("DELETE FROM api_tokens WHERE username = $1 RETURNING *")
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(token.map(ApiTokenDBResponse::from))
    }
}
