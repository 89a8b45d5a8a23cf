//! Admin authentication service.
//!
//! Email and password login with argon2id hashes. Successful logins are
//! turned into a session entry and a bearer token by the route layer.

mod error;
pub mod jwt;

pub use error::AdminAuthError;
pub use jwt::{Claims, IssuedToken, JwtError, JwtService};

use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sqlx::PgPool;

use cobbler_core::Email;

use crate::db::RepositoryError;
use crate::db::admin_users::AdminUserRepository;
use crate::models::admin_user::{AdminRole, AdminUser};

/// Shortest password accepted for an admin account.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Verified against when the email is unknown, so a miss costs as much as
/// a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("cobbler-timing-equalizer").ok());

/// Hash a password into an argon2id PHC string with a random salt.
///
/// # Errors
///
/// Returns `AdminAuthError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AdminAuthError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string. Malformed hashes never
/// verify.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`] characters.
///
/// # Errors
///
/// Returns `AdminAuthError::WeakPassword`.
pub fn validate_password(password: &str) -> Result<(), AdminAuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: AdminUserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
        }
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` for a malformed or
    /// unknown email or a wrong password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AdminUser, AdminAuthError> {
        let Ok(email) = Email::parse(email) else {
            burn_dummy_verify(password);
            return Err(AdminAuthError::InvalidCredentials);
        };

        let Some(user) = self.users.get_by_email(&email).await? else {
            burn_dummy_verify(password);
            return Err(AdminAuthError::InvalidCredentials);
        };

        let hash = self
            .users
            .get_password_hash(user.id)
            .await?
            .ok_or(AdminAuthError::InvalidCredentials)?;

        if !verify_password(password, &hash) {
            return Err(AdminAuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Create an admin with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidEmail`, `AdminAuthError::WeakPassword`
    /// or `AdminAuthError::UserAlreadyExists`.
    pub async fn create_admin(
        &self,
        email: &str,
        name: &str,
        role: AdminRole,
        password: &str,
    ) -> Result<AdminUser, AdminAuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let hash = hash_password(password)?;

        match self.users.create(&email, name.trim(), role, &hash).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::Conflict(_)) => Err(AdminAuthError::UserAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }
}

fn burn_dummy_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}
