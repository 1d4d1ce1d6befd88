//! Account lifecycle: registration, login, refresh, profile updates, soft
//! deletion, and current-user lookup.
//!
//! These are plain async functions over a database connection so they can be
//! exercised directly in tests and composed by the HTTP handlers. Argon2
//! hashing runs on the blocking pool; it is deliberately too expensive for an
//! async worker thread.

use crate::auth::password::{self, Argon2Params};
use crate::auth::session::{self, TokenPair};
use crate::config::Config;
use crate::db::{
    errors::DbError,
    handlers::{repository::Repository, users::Users},
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::errors::{Error, Result};
use crate::types::UserId;
use sqlx::PgConnection;
use tokio::task::spawn_blocking;
use tracing::instrument;

/// A new account to register.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub avatar: Option<String>,
    pub role: Option<String>,
}

/// A partial profile update. `None` fields are left untouched; a new
/// password is re-hashed before storage. `active` and `role` are only
/// reachable through the admin surface.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub active: Option<bool>,
    pub role: Option<String>,
}

async fn hash_password(password: String, params: Argon2Params) -> Result<String> {
    spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password hashing task: {e}"),
        })?
}

fn check_password_length(password: &str, config: &Config) -> Result<()> {
    let policy = &config.auth.password;
    if password.len() < policy.min_length || password.len() > policy.max_length {
        return Err(Error::BadRequest {
            message: format!(
                "Password must be between {} and {} characters",
                policy.min_length, policy.max_length
            ),
        });
    }
    Ok(())
}

/// Register a new account.
///
/// Any email collision collapses into [`Error::DuplicateAccount`].
#[instrument(skip(db, config, account), fields(email = %account.email), err)]
pub async fn register(db: &mut PgConnection, config: &Config, account: NewAccount) -> Result<UserDBResponse> {
    check_password_length(&account.password, config)?;

    let params = Argon2Params::from(&config.auth.password);
    let password_hash = hash_password(account.password, params).await?;

    let request = UserCreateDBRequest {
        email: account.email,
        password_hash,
        name: account.name,
        avatar: account.avatar,
        role: account.role,
    };

    Users::new(db).create(&request).await.map_err(|err| match err {
        DbError::UniqueViolation { .. } => Error::DuplicateAccount,
        other => Error::Database(other),
    })
}

/// Authenticate with email and password.
///
/// Unknown email and wrong password are indistinguishable to the caller.
#[instrument(skip_all, fields(email = %email), err)]
pub async fn login(db: &mut PgConnection, config: &Config, email: &str, password: &str) -> Result<(UserDBResponse, TokenPair)> {
    let user = Users::new(db)
        .get_user_by_email(email)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let candidate = password.to_string();
    let valid = spawn_blocking(move || password::verify_string(&candidate, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join password verification task: {e}"),
        })??;

    if !valid {
        return Err(Error::InvalidCredentials);
    }

    let pair = session::issue_token_pair(user.id, config)?;
    Ok((user, pair))
}

/// Exchange a valid refresh token for a brand-new token pair.
///
/// There is no revocation list; the old refresh token stays valid until it
/// expires on its own.
#[instrument(skip_all, err)]
pub async fn refresh(db: &mut PgConnection, config: &Config, refresh_token: &str) -> Result<TokenPair> {
    let claims = session::verify_session_token(refresh_token, config)?;

    // The subject must still resolve to a user row
    Users::new(db)
        .get_by_id(claims.sub)
        .await?
        .ok_or(Error::UserNotFound)?;

    session::issue_token_pair(claims.sub, config)
}

/// Apply a partial profile update to `user_id`.
#[instrument(skip(db, config, patch), fields(user_id = %user_id), err)]
pub async fn update_profile(
    db: &mut PgConnection,
    config: &Config,
    user_id: UserId,
    patch: ProfilePatch,
) -> Result<UserDBResponse> {
    let password_hash = match patch.password {
        Some(password) => {
            check_password_length(&password, config)?;
            Some(hash_password(password, Argon2Params::from(&config.auth.password)).await?)
        }
        None => None,
    };

    let request = UserUpdateDBRequest {
        email: patch.email,
        password_hash,
        name: patch.name,
        avatar: patch.avatar,
        active: patch.active,
        role: patch.role,
    };

    Users::new(db).update(user_id, &request).await.map_err(|err| match err {
        DbError::NotFound => Error::UserNotFound,
        DbError::UniqueViolation { .. } => Error::DuplicateAccount,
        other => Error::Database(other),
    })
}

/// Soft-delete `user_id`: the row stays, flagged inactive with a deletion
/// timestamp.
#[instrument(skip(db), fields(user_id = %user_id), err)]
pub async fn soft_delete(db: &mut PgConnection, user_id: UserId) -> Result<()> {
    let deleted = Users::new(db).delete(user_id).await?;
    if !deleted {
        return Err(Error::UserNotFound);
    }
    Ok(())
}

/// Resolve a session token to its user, degrading to `None` on any failure.
///
/// This deliberately never errors: a missing header, an expired token, or a
/// vanished user all look the same to the caller.
#[instrument(skip_all)]
pub async fn current_user(db: &mut PgConnection, config: &Config, token: Option<&str>) -> Option<UserDBResponse> {
    let token = token?;
    let claims = session::verify_session_token(token, config).ok()?;
    Users::new(db).get_by_id(claims.sub).await.ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            name: "Test User".to_string(),
            avatar: None,
            role: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_and_login(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let user = register(&mut conn, &config, account("reg@example.com")).await.unwrap();
        assert_eq!(user.email, "reg@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));

        let (logged_in, pair) = login(&mut conn, &config, "reg@example.com", "correct horse battery")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(!pair.token.is_empty());
        assert!(!pair.refresh_token.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_failures_are_indistinguishable(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        register(&mut conn, &config, account("victim@example.com")).await.unwrap();

        let wrong_password = login(&mut conn, &config, "victim@example.com", "guess").await;
        let unknown_email = login(&mut conn, &config, "nobody@example.com", "guess").await;

        assert!(matches!(wrong_password, Err(Error::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(Error::InvalidCredentials)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_duplicate_email(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        register(&mut conn, &config, account("twice@example.com")).await.unwrap();
        let result = register(&mut conn, &config, account("twice@example.com")).await;

        assert!(matches!(result, Err(Error::DuplicateAccount)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_rejects_short_password(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let mut short = account("short@example.com");
        short.password = "abc".to_string();

        let result = register(&mut conn, &config, short).await;
        assert!(matches!(result, Err(Error::BadRequest { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_refresh_issues_new_pair(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let user = register(&mut conn, &config, account("fresh@example.com")).await.unwrap();
        let (_, pair) = login(&mut conn, &config, "fresh@example.com", "correct horse battery")
            .await
            .unwrap();

        let renewed = refresh(&mut conn, &config, &pair.refresh_token).await.unwrap();
        let claims = session::verify_session_token(&renewed.token, &config).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_refresh_unknown_subject(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        // A validly signed token for a user that does not exist
        let pair = session::issue_token_pair(Uuid::new_v4(), &config).unwrap();

        let result = refresh(&mut conn, &config, &pair.refresh_token).await;
        assert!(matches!(result, Err(Error::UserNotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_profile_rehashes_password(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let user = register(&mut conn, &config, account("patch@example.com")).await.unwrap();

        let updated = update_profile(
            &mut conn,
            &config,
            user.id,
            ProfilePatch {
                name: Some("Renamed".to_string()),
                password: Some("a brand new password".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_ne!(updated.password_hash, user.password_hash);

        // The new password works, the old one does not
        assert!(login(&mut conn, &config, "patch@example.com", "a brand new password").await.is_ok());
        assert!(matches!(
            login(&mut conn, &config, "patch@example.com", "correct horse battery").await,
            Err(Error::InvalidCredentials)
        ));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_soft_delete_and_current_user(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        let user = register(&mut conn, &config, account("gone@example.com")).await.unwrap();
        let pair = session::issue_token_pair(user.id, &config).unwrap();

        let resolved = current_user(&mut conn, &config, Some(&pair.token)).await.unwrap();
        assert_eq!(resolved.id, user.id);

        soft_delete(&mut conn, user.id).await.unwrap();

        // The row is retained and still resolvable by id
        let after = current_user(&mut conn, &config, Some(&pair.token)).await.unwrap();
        assert!(!after.active);
        assert!(after.deleted_at.is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_current_user_degrades_to_none(pool: PgPool) {
        let config = create_test_config();
        let mut conn = pool.acquire().await.unwrap();

        assert!(current_user(&mut conn, &config, None).await.is_none());
        assert!(current_user(&mut conn, &config, Some("garbage")).await.is_none());

        // Valid token, vanished user
        let pair = session::issue_token_pair(Uuid::new_v4(), &config).unwrap();
        assert!(current_user(&mut conn, &config, Some(&pair.token)).await.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_soft_delete_unknown_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();

        let result = soft_delete(&mut conn, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::UserNotFound)));
    }
}
