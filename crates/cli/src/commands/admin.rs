//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! COBBLER_ADMIN_PASSWORD=... cobbler admin create -e admin@example.com -n "Admin Name" -r super_admin
//! ```

use cobbler_admin::db;
use cobbler_admin::services::{AdminAuthError, AdminAuthService};
use cobbler_core::AdminRole;
use thiserror::Error;

use super::{DATABASE_URL_VAR, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

/// Create a new admin user with a password.
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns an error for an unknown role, an invalid email, a weak
/// password, a taken email or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<i32, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let url = database_url().ok_or(AdminError::MissingEnvVar(DATABASE_URL_VAR))?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let admin = AdminAuthService::new(&pool)
        .create_admin(email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );

    Ok(admin.id.as_i32())
}
