//! Handlers for the static API-token endpoints.
//!
//! `check_api_token` is deliberately open: machine clients use it to probe
//! whether their stored credentials are still valid. Creation and revocation
//! sit behind the concealing static-token admin guard.

use crate::api::models::api_tokens::{ApiTokenCheckRequest, ApiTokenCreateRequest, ApiTokenResponse, ApiTokenRevokeRequest};
use crate::crypto;
use crate::db::errors::DbError;
use crate::db::handlers::api_tokens::ApiTokens;
use crate::db::models::api_tokens::ApiTokenCreateDBRequest;
use crate::errors::{Error, Result};
use crate::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::instrument;

#[instrument(skip_all, fields(username = %request.username))]
pub async fn check_api_token(
    State(state): State<AppState>,
    Json(request): Json<ApiTokenCheckRequest>,
) -> Result<Json<Value>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let record = ApiTokens::new(&mut conn).get_by_username(&request.username).await?;

    match record {
        Some(record) if record.token == request.token => Ok(Json(json!({ "result": "success" }))),
        _ => Err(Error::BadRequest {
            message: "Token is not valid".to_string(),
        }),
    }
}

#[instrument(skip_all, fields(username = %request.username))]
pub async fn create_api_token(
    State(state): State<AppState>,
    Json(request): Json<ApiTokenCreateRequest>,
) -> Result<(StatusCode, Json<ApiTokenResponse>)> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let db_request = ApiTokenCreateDBRequest {
        token: crypto::generate_api_token(),
        username: request.username,
        description: request.description,
        is_admin: request.is_admin.unwrap_or(false),
        is_moderator: request.is_moderator.unwrap_or(false),
    };

    let record = ApiTokens::new(&mut conn).create(&db_request).await?;
    Ok((StatusCode::CREATED, Json(ApiTokenResponse::from(record))))
}

#[instrument(skip_all, fields(username = %request.username))]
pub async fn remove_api_token(
    State(state): State<AppState>,
    Json(request): Json<ApiTokenRevokeRequest>,
) -> Result<Json<ApiTokenResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let record = ApiTokens::new(&mut conn)
        .delete_by_username(&request.username)
        .await?
        .ok_or(Error::NotFound {
            resource: "API token".to_string(),
            id: request.username,
        })?;

    Ok(Json(ApiTokenResponse::from(record)))
}
