//! Session token issuing and verification.
//!
//! Sessions are stateless JWTs signed with the service's symmetric secret.
//! A successful login produces a [`TokenPair`]: a short-lived access token
//! and a longer-lived refresh token carrying identical claims, differing
//! only in expiry. Verification is shared; the refresh endpoint simply
//! accepts the refresh token and mints a fresh pair.

use crate::config::Config;
use crate::errors::Error;
use crate::types::UserId;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The user id this session belongs to
    pub sub: UserId,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// The pair of tokens returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

fn signing_secret(config: &Config) -> Result<&[u8], Error> {
    // validate() requires this at startup; absence here is a programming error
    config
        .secret_key
        .as_deref()
        .map(str::as_bytes)
        .ok_or(Error::Internal {
            operation: "session token signing".to_string(),
        })
}

fn encode_claims(claims: &SessionClaims, config: &Config) -> Result<String, Error> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(signing_secret(config)?))
        .map_err(map_jwt_error)
}

/// Mint an access/refresh token pair for `user_id`.
pub fn issue_token_pair(user_id: UserId, config: &Config) -> Result<TokenPair, Error> {
    let now = Utc::now().timestamp();
    let session = &config.auth.session;

    let access = SessionClaims {
        sub: user_id,
        iat: now,
        exp: now + session.access_token_expiry.as_secs() as i64,
    };
    let refresh = SessionClaims {
        exp: now + session.refresh_token_expiry.as_secs() as i64,
        ..access.clone()
    };

    Ok(TokenPair {
        token: encode_claims(&access, config)?,
        refresh_token: encode_claims(&refresh, config)?,
    })
}

/// Verify a session token (access or refresh) and return its claims.
///
/// Expiry is enforced by the default validation.
pub fn verify_session_token(token: &str, config: &Config) -> Result<SessionClaims, Error> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(signing_secret(config)?),
        &Validation::default(),
    )
    .map_err(map_jwt_error)?;

    Ok(data.claims)
}

/// Partition jsonwebtoken failures into client faults and server faults.
///
/// Anything wrong with the presented token is the caller's problem and maps
/// to [`Error::InvalidToken`]; key-material and encoding failures are ours.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> Error {
    match err.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::Base64(_)
        | ErrorKind::InvalidAlgorithm => Error::InvalidToken,
        ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::RsaFailedSigning
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::MissingAlgorithm
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::Crypto(_) => Error::Internal {
            operation: "session token processing".to_string(),
        },
        _ => Error::Internal {
            operation: "session token processing".to_string(),
        },
    }
}

/// Extractor for the session user on routes behind the session guard.
///
/// Reads the `token` header and verifies it against the configured secret.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: UserId,
    pub claims: SessionClaims,
}

impl FromRequestParts<crate::AppState> for SessionUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &crate::AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("token")
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::Unauthorized {
                message: Some("Authentication required".to_string()),
            })?;

        let claims = verify_session_token(token, &state.config)?;

        Ok(SessionUser {
            user_id: claims.sub,
            claims,
        })
    }
}
