//! Admin handlers for user management.
//!
//! These sit behind the session admin guard.

use crate::api::models::users::{AdminUserUpdateRequest, UserCreateRequest, UserListQuery, UserResponse};
use crate::auth::accounts::{self, NewAccount, ProfilePatch};
use crate::db::errors::DbError;
use crate::db::handlers::{
    repository::Repository,
    users::{UserFilter, Users},
};
use crate::errors::{Error, Result};
use crate::types::UserId;
use crate::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

#[instrument(skip_all, fields(email = %request.email))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let account = NewAccount {
        email: request.email,
        password: request.password,
        name: request.name,
        avatar: request.avatar,
        role: request.role,
    };

    let user = accounts::register(&mut conn, &state.config, account).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip_all, fields(search = query.search.as_deref()))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let users = Users::new(&mut conn).list(&UserFilter::new(query.search)).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let user = Users::new(&mut conn).get_by_id(id).await?.ok_or(Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    })?;

    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(request): Json<AdminUserUpdateRequest>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    let patch = ProfilePatch {
        email: request.email,
        password: request.password,
        name: request.name,
        avatar: request.avatar,
        active: request.active,
        role: request.role,
    };

    let user = accounts::update_profile(&mut conn, &state.config, id, patch).await?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip_all, fields(user_id = %id))]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<UserId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;

    accounts::soft_delete(&mut conn, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
