//! One-off catalog sync.
//!
//! Uses the same `CatalogSync` as the admin server, so the run is recorded
//! in `catalog.sync_run` alongside scheduled ones.

use thiserror::Error;

use cobbler_admin::config::{ConfigError, ShopifyAdminConfig};
use cobbler_admin::db;
use cobbler_admin::services::{CatalogSync, SyncError, SyncTrigger};
use cobbler_admin::shopify::{AdminClient, AdminShopifyError};

use super::{DATABASE_URL_VAR, database_url};

#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Shopify(#[from] AdminShopifyError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Run one sync and log the report.
///
/// # Errors
///
/// Returns an error if configuration is missing, another sync holds the
/// lock in this process, or the run fails.
pub async fn run() -> Result<(), SyncCommandError> {
    let url = database_url().ok_or(SyncCommandError::MissingEnvVar(DATABASE_URL_VAR))?;
    let shopify = ShopifyAdminConfig::from_env()?;

    let pool = db::create_pool(&url).await?;
    let client = AdminClient::new(&shopify)?;
    let sync = CatalogSync::new(pool, client);

    tracing::info!(store = %shopify.store, "Starting catalog sync");
    let report = sync.try_run(SyncTrigger::Cli).await?;

    tracing::info!(
        products = report.products,
        variants = report.variants,
        images = report.images,
        collections = report.collections,
        skipped_variants = report.skipped_variants,
        failed_products = report.failed_products,
        failed_collections = report.failed_collections,
        pruned_variants = report.pruned_variants,
        "Catalog sync complete"
    );
    if report.failed_products > 0 || report.failed_collections > 0 {
        tracing::warn!("Some products or collections failed; see the logs above");
    }

    Ok(())
}
