//! Shared helpers for tests.
//!
//! Argon2 cost is dialed down to the minimum so database-backed tests stay
//! fast; production defaults live in [`crate::config::PasswordConfig`].

use crate::AppState;
use crate::auth::password::{Argon2Params, hash_string_with_params};
use crate::config::Config;
use crate::crypto::generate_api_token;
use crate::db::handlers::{api_tokens::ApiTokens, repository::Repository, users::Users};
use crate::db::models::{
    api_tokens::{ApiTokenCreateDBRequest, ApiTokenDBResponse},
    users::{UserCreateDBRequest, UserDBResponse},
};
use sqlx::PgPool;

pub fn create_test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key".to_string()),
        ..Default::default()
    };
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config
}

pub async fn create_test_app_state(pool: PgPool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

fn cheap_hash(password: &str) -> String {
    let params = Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    hash_string_with_params(password, Some(params)).unwrap()
}

async fn insert_user(pool: &PgPool, email: &str, role: Option<&str>) -> UserDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash: cheap_hash("test password"),
            name: "Test User".to_string(),
            avatar: None,
            role: role.map(str::to_string),
        })
        .await
        .unwrap()
}

/// Insert a regular user whose password is `test password`.
pub async fn create_test_user(pool: &PgPool, email: &str) -> UserDBResponse {
    insert_user(pool, email, None).await
}

/// Insert an admin user whose password is `test password`.
pub async fn create_test_admin(pool: &PgPool, email: &str) -> UserDBResponse {
    insert_user(pool, email, Some("admin")).await
}

pub async fn create_test_api_token(pool: &PgPool, username: &str, is_admin: bool) -> ApiTokenDBResponse {
    let mut conn = pool.acquire().await.unwrap();
    ApiTokens::new(&mut conn)
        .create(&ApiTokenCreateDBRequest {
            token: generate_api_token(),
            username: username.to_string(),
            description: None,
            is_admin,
            is_moderator: false,
        })
        .await
        .unwrap()
}
