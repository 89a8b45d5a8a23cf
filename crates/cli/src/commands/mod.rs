//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod sync;

use secrecy::SecretString;

/// Environment variable holding the admin database URL.
pub const DATABASE_URL_VAR: &str = "ADMIN_DATABASE_URL";

/// Read `ADMIN_DATABASE_URL` (falling back to `DATABASE_URL`), loading
/// `.env` first.
pub fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
