//! Authorization middleware.
//!
//! Two independent schemes guard the HTTP surface:
//!
//! - **Session scheme**: a JWT in the `token` header. Missing or invalid
//!   credentials are a 401, an insufficient role is a 403.
//! - **Static-token scheme**: `token` + `username` headers checked against
//!   the API-token store. Failures are coarse 403s with a `message` body;
//!   the admin variant conceals every rejection as an empty 404, so probing
//!   callers cannot tell a guarded route from a missing one.
//!
//! Each middleware is a thin wrapper over a plain function from request to
//! request, so the logic is testable without standing up a router.

use crate::auth::session::verify_session_token;
use crate::db::{
    errors::DbError,
    handlers::{api_tokens::ApiTokens, repository::Repository, users::Users},
};
use crate::errors::Error;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

// Owned, so no borrow of the request body is held across an await point.
// `Body` is !Sync, and a guard future holding `&Request` would not be Send.
fn header(request: &Request, name: &str) -> Option<String> {
    request.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Session scheme: require a valid session token.
///
/// Missing and invalid tokens are both 401s; only role failures are 403.
pub(crate) async fn authenticate(state: AppState, request: Request) -> Result<Request, Error> {
    let token = header(&request, "token").ok_or(Error::Unauthorized {
        message: Some("Authentication required".to_string()),
    })?;

    verify_session_token(&token, &state.config)?;

    Ok(request)
}

/// Session scheme: require a valid session token belonging to an admin.
pub(crate) async fn authenticate_admin(state: AppState, request: Request) -> Result<Request, Error> {
    let token = header(&request, "token").ok_or(Error::Unauthorized {
        message: Some("Authentication required".to_string()),
    })?;

    let claims = verify_session_token(&token, &state.config)?;

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let user = Users::new(&mut conn)
        .get_by_id(claims.sub)
        .await?
        .ok_or(Error::Unauthorized { message: None })?;

    if !user.is_admin() {
        return Err(Error::Forbidden {
            message: Some("Admin privileges required".to_string()),
        });
    }

    Ok(request)
}

async fn check_static_credentials(
    state: &AppState,
    token: Option<String>,
    username: Option<String>,
    require_admin: bool,
) -> Result<(), Error> {
    let (Some(token), Some(username)) = (token, username) else {
        return Err(Error::AuthDenied {
            message: "Auth not provided".to_string(),
            concealed: false,
        });
    };

    let invalid = Error::AuthDenied {
        message: "Your auth is not valid".to_string(),
        concealed: false,
    };

    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let record = ApiTokens::new(&mut conn).get_by_username(&username).await?;

    match record {
        Some(record) if record.token == token && (!require_admin || record.is_admin) => Ok(()),
        _ => Err(invalid),
    }
}

/// Static-token scheme: require a valid `token` + `username` header pair.
pub(crate) async fn authenticate_service(state: AppState, request: Request) -> Result<Request, Error> {
    let token = header(&request, "token");
    let username = header(&request, "username");
    check_static_credentials(&state, token, username, false).await?;
    Ok(request)
}

/// Static-token scheme, admin tokens only. Every rejection is concealed as
/// an empty 404.
pub(crate) async fn authenticate_service_admin(state: AppState, request: Request) -> Result<Request, Error> {
    let token = header(&request, "token");
    let username = header(&request, "username");
    check_static_credentials(&state, token, username, true).await.map_err(|err| {
        let message = match err {
            Error::AuthDenied { message, .. } => message,
            other => other.user_message(),
        };
        Error::AuthDenied { message, concealed: true }
    })?;
    Ok(request)
}

// Public middleware entry points, wired with `middleware::from_fn_with_state`.

pub async fn session_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match authenticate(state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

pub async fn session_auth_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match authenticate_admin(state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

pub async fn service_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match authenticate_service(state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

pub async fn service_auth_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match authenticate_service_admin(state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::issue_token_pair;
    use crate::test_utils::{create_test_admin, create_test_api_token, create_test_app_state, create_test_user};
    use axum::body::Body;
    use sqlx::PgPool;

    fn request_with_headers(headers: &[(&str, &str)]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_missing_token_is_unauthorized(pool: PgPool) {
        let state = create_test_app_state(pool).await;

        let result = authenticate(state, request_with_headers(&[])).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_invalid_token_is_unauthorized(pool: PgPool) {
        let state = create_test_app_state(pool).await;

        // Invalid and missing tokens get the same status class
        let result = authenticate(state, request_with_headers(&[("token", "garbage")])).await;
        match result {
            Err(err) => {
                assert!(matches!(err, Error::InvalidToken));
                assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
            }
            Ok(_) => panic!("expected rejection"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_admin_unresolvable_subject_is_unauthorized(pool: PgPool) {
        let state = create_test_app_state(pool).await;

        // Validly signed token for a user that does not exist
        let pair = issue_token_pair(uuid::Uuid::new_v4(), &state.config).unwrap();

        let result = authenticate_admin(state, request_with_headers(&[("token", &pair.token)])).await;
        assert!(matches!(result, Err(Error::Unauthorized { .. })));
    }

    // The guards run under axum's middleware plumbing, which requires Send
    // futures. Regression check: holding borrowed request data across the
    // database awaits would break this.
    #[sqlx::test]
    #[test_log::test]
    async fn test_guard_futures_are_send(pool: PgPool) {
        fn assert_send<F: std::future::Future + Send>(f: F) -> F {
            f
        }

        let state = create_test_app_state(pool).await;

        assert_send(authenticate(state.clone(), request_with_headers(&[]))).await.ok();
        assert_send(authenticate_admin(state.clone(), request_with_headers(&[]))).await.ok();
        assert_send(authenticate_service(state.clone(), request_with_headers(&[]))).await.ok();
        assert_send(authenticate_service_admin(state, request_with_headers(&[]))).await.ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_valid_token_passes(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        let user = create_test_user(&state.db, "session@example.com").await;
        let pair = issue_token_pair(user.id, &state.config).unwrap();

        let result = authenticate(state, request_with_headers(&[("token", &pair.token)])).await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_admin_rejects_regular_user(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        let user = create_test_user(&state.db, "pleb@example.com").await;
        let pair = issue_token_pair(user.id, &state.config).unwrap();

        let result = authenticate_admin(state, request_with_headers(&[("token", &pair.token)])).await;
        match result {
            Err(Error::Forbidden { message }) => {
                assert_eq!(message.as_deref(), Some("Admin privileges required"));
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_admin_accepts_admin(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        let admin = create_test_admin(&state.db, "boss@example.com").await;
        let pair = issue_token_pair(admin.id, &state.config).unwrap();

        let result = authenticate_admin(state, request_with_headers(&[("token", &pair.token)])).await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_static_missing_headers(pool: PgPool) {
        let state = create_test_app_state(pool).await;

        // Either header missing trips the same rejection
        for headers in [vec![], vec![("token", "x")], vec![("username", "svc")]] {
            let result = authenticate_service(state.clone(), request_with_headers(&headers)).await;
            match result {
                Err(Error::AuthDenied { message, concealed }) => {
                    assert_eq!(message, "Auth not provided");
                    assert!(!concealed);
                }
                other => panic!("expected AuthDenied, got {other:?}"),
            }
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_static_wrong_token(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        create_test_api_token(&state.db, "svc", false).await;

        let result = authenticate_service(
            state,
            request_with_headers(&[("token", "0000"), ("username", "svc")]),
        )
        .await;
        match result {
            Err(Error::AuthDenied { message, concealed }) => {
                assert_eq!(message, "Your auth is not valid");
                assert!(!concealed);
            }
            other => panic!("expected AuthDenied, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_static_valid_token_passes(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        let record = create_test_api_token(&state.db, "svc", false).await;

        let result = authenticate_service(
            state,
            request_with_headers(&[("token", &record.token), ("username", "svc")]),
        )
        .await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_static_admin_conceals_all_failures(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        let non_admin = create_test_api_token(&state.db, "svc", false).await;

        // Missing headers, wrong token, and a non-admin token all conceal
        let cases = [
            vec![],
            vec![("token", "0000"), ("username", "svc")],
            vec![("token", non_admin.token.as_str()), ("username", "svc")],
        ];
        for headers in cases {
            let result = authenticate_service_admin(state.clone(), request_with_headers(&headers)).await;
            match result {
                Err(Error::AuthDenied { concealed, .. }) => assert!(concealed),
                other => panic!("expected concealed AuthDenied, got {other:?}"),
            }
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_static_admin_accepts_admin_token(pool: PgPool) {
        let state = create_test_app_state(pool).await;
        let record = create_test_api_token(&state.db, "root-svc", true).await;

        let result = authenticate_service_admin(
            state,
            request_with_headers(&[("token", &record.token), ("username", "root-svc")]),
        )
        .await;
        assert!(result.is_ok());
    }
}
