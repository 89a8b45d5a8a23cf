//! Admin authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during admin authentication operations.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] cobbler_core::EmailError),

    /// Unknown email or wrong password. The two are deliberately
    /// indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Admin user not found.
    #[error("admin user not found")]
    UserNotFound,

    /// Admin user already exists.
    #[error("admin user already exists")]
    UserAlreadyExists,

    /// Password does not meet the length requirement.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Hashing failed (bad parameters or RNG failure).
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Token could not be issued or verified.
    #[error(transparent)]
    Jwt(#[from] super::jwt::JwtError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
