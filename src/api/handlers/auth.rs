//! Handlers for login, refresh, and the self-service `/me` routes.

use crate::api::models::auth::{LoginRequest, LoginResponse, RefreshRequest};
use crate::api::models::users::{ProfileUpdateRequest, UserResponse};
use crate::auth::accounts::{self, ProfilePatch};
use crate::auth::session::{SessionUser, TokenPair};
use crate::db::errors::DbError;
use crate::errors::{Error, Result};
use crate::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::instrument;

#[instrument(skip_all, fields(email = %request.email))]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let (user, token) = accounts::login(&mut conn, &state.config, &request.email, &request.password).await?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(user),
        token,
    }))
}

#[instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<Json<TokenPair>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let pair = accounts::refresh(&mut conn, &state.config, &request.refresh_token).await?;
    Ok(Json(pair))
}

/// Resolve the calling session to its user.
///
/// The guard has already vetted the token, but resolution can still come up
/// empty if the user row has vanished since.
#[instrument(skip_all)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let token = headers.get("token").and_then(|v| v.to_str().ok());
    let user = accounts::current_user(&mut conn, &state.config, token)
        .await
        .ok_or(Error::UserNotFound)?;

    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    session: SessionUser,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let patch = ProfilePatch {
        email: request.email,
        password: request.password,
        name: request.name,
        avatar: request.avatar,
        ..Default::default()
    };

    let user = accounts::update_profile(&mut conn, &state.config, session.user_id, patch).await?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn delete_me(State(state): State<AppState>, session: SessionUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    accounts::soft_delete(&mut conn, session.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
