//! Session middleware configuration for admin.
//!
//! Sessions live in `admin.session` through the tower-sessions Postgres
//! store. Cookies are `SameSite=Strict`, `HttpOnly`, and expire after 24
//! hours without a request.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "cobbler_admin_session";

/// Inactivity window before a session expires.
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// The Postgres session store in `admin.session`.
///
/// # Panics
///
/// Panics if the hardcoded schema or table name is rejected.
#[must_use]
pub fn session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
        .with_schema_name("admin")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name")
}

/// Create the session layer over `store`.
#[must_use]
pub fn create_session_layer(
    store: PostgresStore,
    config: &AdminConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
