//! Database operations for the catalog and admin schemas.
//!
//! # Schemas
//!
//! - `catalog` - option tables, products, variants, images, SEO, collections
//! - `admin` - admin users, sessions, sync run history
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p cobbler-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as::<_, Row>` and `QueryBuilder`)
//! so the workspace builds without a live database.

pub mod admin_users;
pub mod collections;
pub mod dashboard;
pub mod images;
pub mod options;
pub mod products;
pub mod seo;
pub mod sync_runs;
pub mod variants;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cobbler_core::{PageRequest, SortDirection};

pub use admin_users::AdminUserRepository;
pub use collections::CollectionRepository;
pub use dashboard::{DashboardCounts, DashboardRepository};
pub use images::ImageRepository;
pub use options::OptionRepository;
pub use products::ProductRepository;
pub use seo::SeoRepository;
pub use sync_runs::SyncRunRepository;
pub use variants::VariantRepository;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate name, option still in use).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Translate constraint violations into [`RepositoryError::Conflict`].
///
/// `unique` and `in_use` are the client-facing messages for SQLSTATE
/// `23505` and `23503` respectively.
pub(crate) fn map_db_error(err: sqlx::Error, unique: &str, in_use: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return RepositoryError::Conflict(unique.to_owned()),
            Some(FOREIGN_KEY_VIOLATION) => return RepositoryError::Conflict(in_use.to_owned()),
            _ => {}
        }
    }
    RepositoryError::Database(err)
}

/// Validated paging, sorting and search for a list query.
///
/// `sort_column` is always one of the repository's whitelisted columns, so
/// it is safe to splice into `ORDER BY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: PageRequest,
    pub sort_column: &'static str,
    pub direction: SortDirection,
    pub search: Option<String>,
}

impl ListQuery {
    /// Resolve a requested sort against `allowed`; `None` picks the first.
    ///
    /// Returns `None` when the requested column is not whitelisted.
    #[must_use]
    pub fn new(
        page: PageRequest,
        sort: Option<&str>,
        direction: SortDirection,
        search: Option<&str>,
        allowed: &[&'static str],
    ) -> Option<Self> {
        let sort_column = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) => allowed.iter().copied().find(|c| *c == requested)?,
            None => allowed.first().copied()?,
        };
        Some(Self {
            page,
            sort_column,
            direction,
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        })
    }

    /// `ILIKE` pattern for the search term, with wildcards escaped.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|term| {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["name", "sort_order", "created_at"];

    #[test]
    fn test_list_query_defaults_to_first_column() {
        let query = ListQuery::new(
            PageRequest::default(),
            None,
            SortDirection::Asc,
            Some("  "),
            COLUMNS,
        )
        .unwrap();
        assert_eq!(query.sort_column, "name");
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_list_query_rejects_unknown_sort() {
        assert!(
            ListQuery::new(
                PageRequest::default(),
                Some("name; DROP TABLE catalog.size"),
                SortDirection::Desc,
                None,
                COLUMNS,
            )
            .is_none()
        );
        let query = ListQuery::new(
            PageRequest::default(),
            Some("created_at"),
            SortDirection::Desc,
            None,
            COLUMNS,
        )
        .unwrap();
        assert_eq!(query.sort_column, "created_at");
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let query = ListQuery::new(
            PageRequest::default(),
            None,
            SortDirection::Asc,
            Some(" 100%_suede "),
            COLUMNS,
        )
        .unwrap();
        assert_eq!(query.search_pattern().unwrap(), "%100\\%\\_suede%");
    }

    #[test]
    fn test_repository_error_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "not found");
        assert_eq!(
            RepositoryError::Conflict("name already exists".to_owned()).to_string(),
            "conflict: name already exists"
        );
    }
}
