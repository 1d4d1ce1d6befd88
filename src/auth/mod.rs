//! Authentication and authorization.
//!
//! - [`password`]: Argon2 hashing and verification.
//! - [`session`]: JWT access/refresh token codec.
//! - [`accounts`]: account lifecycle built on the two above.
//! - [`middleware`]: the session and static-token route guards.

pub mod accounts;
pub mod middleware;
pub mod password;
pub mod session;
