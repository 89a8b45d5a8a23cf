//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health, /health/ready
//!
//! # Auth
//! POST   /api/auth/login               - Password login, sets session, returns JWT
//! POST   /api/auth/logout              - Clear session
//! GET    /api/auth/me                  - Current admin
//! POST   /api/auth/token               - Fresh JWT for the current admin
//!
//! # Catalog
//! GET    /api/dashboard                - Entity counts and last sync run
//! GET    /api/options/{category}       - List/create option values
//! GET    /api/options/{category}/{id}  - Get/update/delete one option value
//! GET    /api/products                 - List/create products
//! GET    /api/products/{id}            - Product detail, update, delete
//! PUT    /api/products/{id}/seo        - Replace SEO fields
//! GET    /api/products/{id}/variants   - List/create variants
//! POST   /api/products/{id}/resolve    - Resolve a combination
//! GET    /api/variants/{id}            - Get/update/delete one variant
//! GET    /api/products/{id}/images     - List/upload images
//! DELETE /api/images/{id}              - Remove an image
//! GET    /api/collections              - Synced collections
//!
//! # Sync
//! POST   /api/sync                     - Start a sync (409 while one runs)
//! GET    /api/sync/runs                - Recent runs
//! POST   /webhooks/shopify             - Signed catalog webhooks
//!
//! # Admin Users (super admin only)
//! GET    /api/admin-users              - List/create admins
//! PUT    /api/admin-users/{id}/role    - Change role
//! DELETE /api/admin-users/{id}         - Remove admin
//! ```

pub mod admin_users;
pub mod auth;
pub mod collections;
pub mod dashboard;
pub mod health;
pub mod images;
pub mod options;
pub mod products;
pub mod sync;
pub mod variants;

use axum::Router;
use serde::Deserialize;

use cobbler_core::{PageRequest, SortDirection};

use crate::db::ListQuery;
use crate::error::AppError;
use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(options::router())
        .merge(products::router())
        .merge(variants::router())
        .merge(images::router())
        .merge(collections::router())
        .merge(sync::router())
        .merge(admin_users::router())
}

/// Query parameters shared by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
    pub q: Option<String>,
}

impl ListParams {
    /// Validate against an entity's sortable columns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a column not in `allowed`.
    pub fn into_query(self, allowed: &[&'static str]) -> Result<ListQuery, AppError> {
        ListQuery::new(
            PageRequest::new(self.page, self.per_page),
            self.sort.as_deref(),
            self.direction,
            self.q.as_deref(),
            allowed,
        )
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "unknown sort column {:?}, expected one of: {}",
                self.sort.as_deref().unwrap_or_default(),
                allowed.join(", ")
            ))
        })
    }
}
