use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Login with an unknown email or a wrong password. One class on purpose:
    /// callers must not be able to tell which half failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// A session token that failed verification (signature, expiry, shape)
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthorized { message: Option<String> },

    /// Authenticated but lacking the required role
    #[error("Insufficient permissions")]
    Forbidden { message: Option<String> },

    /// Static-token scheme rejection. `concealed` responses pretend the route
    /// does not exist (empty 404) instead of admitting the auth failure.
    #[error("{message}")]
    AuthDenied { message: String, concealed: bool },

    /// A user id or email that resolves to nothing
    #[error("User not found")]
    UserNotFound,

    /// Registration against an email that already has an account
    #[error("An account with this email already exists")]
    DuplicateAccount,

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::AuthDenied { concealed, .. } => {
                if *concealed {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::FORBIDDEN
                }
            }
            Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::DuplicateAccount => StatusCode::CONFLICT,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidCredentials => "Invalid email or password".to_string(),
            Error::InvalidToken => "Invalid or expired token".to_string(),
            Error::Unauthorized { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Forbidden { message } => message.clone().unwrap_or_else(|| "Insufficient permissions".to_string()),
            Error::AuthDenied { message, .. } => message.clone(),
            Error::UserNotFound => "User not found".to_string(),
            Error::DuplicateAccount => "An account with this email already exists".to_string(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::BadRequest { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("users"), Some(c)) if c.contains("email") => "An account with this email already exists".to_string(),
                    (Some("api_tokens"), Some(c)) if c.contains("username") => "A token for this username already exists".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) | Error::DuplicateAccount => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::InvalidCredentials
            | Error::InvalidToken
            | Error::Unauthorized { .. }
            | Error::Forbidden { .. }
            | Error::AuthDenied { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::UserNotFound => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // Concealed rejections carry no body at all
            Error::AuthDenied { concealed: true, .. } => status.into_response(),
            // The static-token scheme reports under a "message" key
            Error::AuthDenied { message, .. } => (status, axum::response::Json(json!({ "message": message }))).into_response(),
            _ => (status, axum::response::Json(json!({ "error": self.user_message() }))).into_response(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
