//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cobbler_core::{AdminUserId, Email};

pub use cobbler_core::AdminRole;

/// An admin user (domain type).
///
/// The password hash is not loaded here; see `AdminUserRepository::get_password_hash`.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
    /// When the admin was last updated.
    pub updated_at: DateTime<Utc>,
}
