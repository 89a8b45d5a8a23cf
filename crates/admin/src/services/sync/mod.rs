//! Catalog sync from Shopify.
//!
//! Pulls products (with variants, images and SEO) and collections through
//! the Admin API and upserts them into the `catalog` schema, keyed by
//! Shopify GID. Each product and each collection is applied in its own
//! transaction, so one bad record never rolls back the rest of a run.
//!
//! Runs are serialized by a mutex. The periodic timer, `POST /api/sync`,
//! the webhook and the CLI all contend for the same lock; the first one in
//! wins and the others get [`SyncError::AlreadyRunning`]. Webhooks instead
//! go through [`CatalogSync::request`], which leaves a rerun flag behind
//! when the lock is taken. Whoever releases the lock next starts one more
//! run if the flag is still set.

mod mapping;

pub use mapping::{MappingError, OptionNames, map_selected_options};

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use cobbler_core::{Handle, OptionCategory, OptionKey};

use crate::db::collections::CollectionUpsert;
use crate::db::images::ImageUpsert;
use crate::db::products::ProductUpsert;
use crate::db::variants::VariantUpsert;
use crate::db::{
    CollectionRepository, ImageRepository, OptionRepository, ProductRepository,
    RepositoryError, SeoRepository, SyncRunRepository, VariantRepository,
};
use crate::models::{ProductSeo, SyncReport};
use crate::shopify::queries::{COLLECTIONS_PAGE_SIZE, PRODUCTS_PAGE_SIZE};
use crate::shopify::{AdminClient, AdminShopifyError, ShopifyCollection, ShopifyProduct, ShopifyVariant};

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("a catalog sync is already running")]
    AlreadyRunning,

    #[error("Shopify request failed: {0}")]
    Shopify(#[from] AdminShopifyError),

    #[error("sync bookkeeping failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// What started a run. Stored as `sync_run.triggered_by`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTrigger {
    Schedule,
    Manual { email: String },
    Webhook { topic: String },
    Cli,
    /// Follow-up for a request that arrived during another run.
    Requeued,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule => f.write_str("schedule"),
            Self::Manual { email } => write!(f, "manual:{email}"),
            Self::Webhook { topic } => write!(f, "webhook:{topic}"),
            Self::Cli => f.write_str("cli"),
            Self::Requeued => f.write_str("requeued"),
        }
    }
}

/// Shopify to catalog synchronizer.
pub struct CatalogSync {
    pool: PgPool,
    client: AdminClient,
    lock: Arc<Mutex<()>>,
    rerun: AtomicBool,
}

impl CatalogSync {
    #[must_use]
    pub fn new(pool: PgPool, client: AdminClient) -> Self {
        Self {
            pool,
            client,
            lock: Arc::new(Mutex::new(())),
            rerun: AtomicBool::new(false),
        }
    }

    /// Whether a run currently holds the lock.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Whether a request is waiting for the current run to finish.
    #[must_use]
    pub fn rerun_pending(&self) -> bool {
        self.rerun.load(Ordering::SeqCst)
    }

    /// Run a sync, waiting for any run in progress to finish first.
    ///
    /// # Errors
    ///
    /// Returns an error if Shopify fails or the run cannot be recorded.
    pub async fn run_once(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let guard = self.lock.lock().await;
        let report = self.run_locked(&trigger).await;
        drop(guard);
        self.run_requested().await;
        report
    }

    /// Run a sync unless one is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] when the lock is held, otherwise
    /// the same errors as [`Self::run_once`].
    pub async fn try_run(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let Ok(guard) = self.lock.try_lock() else {
            return Err(SyncError::AlreadyRunning);
        };
        let report = self.run_locked(&trigger).await;
        drop(guard);
        self.run_requested().await;
        report
    }

    /// Take the lock now and run the sync on a background task.
    ///
    /// HTTP handlers use this so the request returns immediately while a
    /// second concurrent request still sees [`SyncError::AlreadyRunning`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] when the lock is held.
    pub fn try_spawn(self: &Arc<Self>, trigger: SyncTrigger) -> Result<JoinHandle<()>, SyncError> {
        let guard: OwnedMutexGuard<()> = Arc::clone(&self.lock)
            .try_lock_owned()
            .map_err(|_| SyncError::AlreadyRunning)?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            if let Err(e) = this.run_locked(&trigger).await {
                warn!(error = %e, %trigger, "Background catalog sync failed");
            }
            drop(guard);
            this.run_requested().await;
        }))
    }

    /// Ask for a run that sees every change made before this call.
    ///
    /// Starts a background run when the lock is free. Otherwise the request
    /// is left as a rerun flag for the run in progress to pick up once it
    /// releases the lock. Returns whether a run was started here.
    pub fn request(self: &Arc<Self>, trigger: SyncTrigger) -> bool {
        self.rerun.store(true, Ordering::SeqCst);
        match self.try_spawn(trigger) {
            Ok(_) => true,
            Err(_) => {
                debug!("Catalog sync in progress, rerun queued");
                false
            }
        }
    }

    /// Run again while a request is pending and nobody else holds the lock.
    ///
    /// Callers must have released the lock. A request that races a release
    /// either sees the lock free and starts its own run, or set the flag
    /// before the release and is picked up here.
    async fn run_requested(&self) {
        while self.rerun.load(Ordering::SeqCst) {
            let Ok(_guard) = self.lock.try_lock() else {
                return;
            };
            if let Err(e) = self.run_locked(&SyncTrigger::Requeued).await {
                warn!(error = %e, "Requeued catalog sync failed");
            }
        }
    }

    /// Start the fixed-interval timer.
    ///
    /// The first tick fires after one `interval` unless `on_startup` is set.
    /// Ticks missed while a run was in progress are skipped.
    pub fn spawn_periodic(self: Arc<Self>, interval: Duration, on_startup: bool) -> JoinHandle<()> {
        info!(
            interval_secs = interval.as_secs(),
            on_startup, "Starting periodic catalog sync"
        );
        tokio::spawn(async move {
            let start = if on_startup {
                Instant::now()
            } else {
                Instant::now() + interval
            };
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match self.try_run(SyncTrigger::Schedule).await {
                    Ok(report) => debug!(?report, "Scheduled catalog sync finished"),
                    Err(SyncError::AlreadyRunning) => {
                        info!("Skipping scheduled catalog sync, a run is in progress");
                    }
                    Err(e) => warn!(error = %e, "Scheduled catalog sync failed"),
                }
            }
        })
    }

    #[instrument(skip_all, fields(%trigger))]
    async fn run_locked(&self, trigger: &SyncTrigger) -> Result<SyncReport, SyncError> {
        // This run covers every request made before it started
        self.rerun.store(false, Ordering::SeqCst);
        let runs = SyncRunRepository::new(&self.pool);
        let run_id = runs.start(&trigger.to_string()).await?;
        info!(run_id = %run_id, "Catalog sync started");

        let mut report = SyncReport::default();
        let outcome = match self.sync_products(&mut report).await {
            Ok(()) => self.sync_collections(&mut report).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                runs.finish(run_id, &report).await?;
                info!(
                    run_id = %run_id,
                    products = report.products,
                    variants = report.variants,
                    images = report.images,
                    collections = report.collections,
                    skipped_variants = report.skipped_variants,
                    failed_products = report.failed_products,
                    "Catalog sync finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Catalog sync failed");
                if let Err(record_err) = runs.fail(run_id, &e.to_string(), &report).await {
                    error!(run_id = %run_id, error = %record_err, "Failed to record sync failure");
                }
                Err(e)
            }
        }
    }

    async fn sync_products(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let mut cursor: Option<String> = None;
        let mut page = 0_u32;

        loop {
            page += 1;
            let connection = self
                .client
                .get_catalog_products(PRODUCTS_PAGE_SIZE, cursor.take())
                .await?;
            debug!(page, batch_size = connection.items.len(), "Received products page");

            for product in &connection.items {
                match self.apply_product(product).await {
                    Ok(tally) => tally.add_to(report),
                    Err(e) => {
                        report.failed_products += 1;
                        warn!(
                            shopify_id = %product.id,
                            handle = %product.handle,
                            error = %e,
                            "Failed to sync product"
                        );
                    }
                }
            }

            match connection.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_owned()),
                None => return Ok(()),
            }
        }
    }

    async fn sync_collections(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let mut cursor: Option<String> = None;

        loop {
            let connection = self
                .client
                .get_catalog_collections(COLLECTIONS_PAGE_SIZE, cursor.take())
                .await?;

            for collection in &connection.items {
                match self.apply_collection(collection).await {
                    Ok(members) => {
                        report.collections += 1;
                        debug!(handle = %collection.handle, members, "Synced collection");
                    }
                    Err(e) => {
                        report.failed_collections += 1;
                        warn!(
                            shopify_id = %collection.id,
                            handle = %collection.handle,
                            error = %e,
                            "Failed to sync collection"
                        );
                    }
                }
            }

            match connection.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_owned()),
                None => return Ok(()),
            }
        }
    }

    /// Apply one product and everything hanging off it in one transaction.
    ///
    /// Applying the same product twice leaves the catalog unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if no handle can be derived
    /// and `RepositoryError::Database` if the transaction fails, in which
    /// case nothing of the product is written.
    pub async fn apply_product(&self, product: &ShopifyProduct) -> Result<ProductTally, RepositoryError> {
        let handle = normalize_handle(product).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "product {} has no usable handle",
                product.id
            ))
        })?;
        let plan = plan_variants(&product.variants);

        let mut tx = self.pool.begin().await?;
        let product_id = ProductRepository::upsert_from_shopify(
            &mut *tx,
            &ProductUpsert {
                shopify_id: &product.id,
                handle: &handle,
                title: &product.title,
                description_html: &product.description_html,
                status: product.status,
                vendor: product.vendor.as_deref(),
                product_type: product.product_type.as_deref(),
                tags: &product.tags,
            },
        )
        .await?;

        match (ProductSeo {
            title: product.seo.title.clone(),
            description: product.seo.description.clone(),
        })
        .validate()
        {
            Ok(seo) => SeoRepository::upsert_in(&mut *tx, product_id, &seo).await?,
            Err(e) => warn!(handle = %handle, error = %e, "Ignoring invalid SEO fields"),
        }

        // Prune first so a recreated Shopify variant can take over the
        // option tuple of the one it replaced.
        let image_ids: Vec<String> = product.images.iter().map(|i| i.id.clone()).collect();
        ImageRepository::prune_unseen(&mut *tx, product_id, &image_ids).await?;
        let variant_ids: Vec<String> = plan.mapped.iter().map(|(v, _)| v.id.clone()).collect();
        let pruned_variants = VariantRepository::prune_unseen(&mut *tx, product_id, &variant_ids).await?;

        for (position, image) in (0_i32..).zip(&product.images) {
            ImageRepository::upsert_from_shopify(
                &mut *tx,
                product_id,
                &ImageUpsert {
                    shopify_id: &image.id,
                    url: &image.url,
                    alt_text: image.alt_text.as_deref(),
                    position,
                    width: image.width,
                    height: image.height,
                },
            )
            .await?;
        }

        let mut option_ids = BTreeMap::new();
        for (variant, names) in &plan.mapped {
            let key = resolve_option_ids(&mut *tx, names, &mut option_ids).await?;
            let variant_id = VariantRepository::upsert_from_shopify(
                &mut *tx,
                product_id,
                &VariantUpsert {
                    shopify_id: &variant.id,
                    sku: variant.sku.as_deref(),
                    title: &variant.title,
                    options: key,
                    price: variant.price,
                    compare_at_price: variant.compare_at_price,
                    inventory_quantity: variant.inventory_quantity,
                },
            )
            .await?;
            if let Some(image_id) = &variant.image_id {
                ImageRepository::assign_variant(&mut *tx, image_id, variant_id).await?;
            }
        }

        ProductRepository::mark_synced(&mut *tx, product_id).await?;
        tx.commit().await?;

        Ok(ProductTally {
            variants: count_u32(plan.mapped.len()),
            images: count_u32(product.images.len()),
            skipped_variants: plan.skipped,
            pruned_variants,
        })
    }

    /// Upsert a collection and replace its memberships. Returns the number
    /// of members that matched a local product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn apply_collection(&self, collection: &ShopifyCollection) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let collection_id = CollectionRepository::upsert_from_shopify(
            &mut *tx,
            &CollectionUpsert {
                shopify_id: &collection.id,
                handle: &collection.handle,
                title: &collection.title,
                description_html: &collection.description_html,
            },
        )
        .await?;
        let members =
            CollectionRepository::replace_products(&mut *tx, collection_id, &collection.product_ids)
                .await?;
        tx.commit().await?;
        Ok(members)
    }
}

impl fmt::Debug for CatalogSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSync")
            .field("store", &self.client.store())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Look up (or create) the local ID of every option value a variant names.
///
/// `cache` is keyed by lowercased name and lives for one product
/// transaction.
async fn resolve_option_ids(
    conn: &mut PgConnection,
    names: &OptionNames,
    cache: &mut BTreeMap<(OptionCategory, String), i32>,
) -> Result<OptionKey, RepositoryError> {
    let mut ids = BTreeMap::new();
    for (category, name) in names.iter() {
        let cache_key = (category, name.to_lowercase());
        let id = match cache.get(&cache_key) {
            Some(id) => *id,
            None => {
                let id = OptionRepository::find_or_create_by_name(conn, category, name).await?;
                cache.insert(cache_key, id);
                id
            }
        };
        ids.insert(category, id);
    }
    Ok(OptionKey::from_fn(|category| {
        ids.get(&category).copied().unwrap_or_default()
    }))
}

/// Counters for one committed product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductTally {
    pub variants: u32,
    pub images: u32,
    pub skipped_variants: u32,
    pub pruned_variants: u64,
}

impl ProductTally {
    fn add_to(self, report: &mut SyncReport) {
        report.products += 1;
        report.variants += self.variants;
        report.images += self.images;
        report.skipped_variants += self.skipped_variants;
        report.pruned_variants += self.pruned_variants;
    }
}

/// Variants that map onto all six categories, plus a count of those that
/// do not.
#[derive(Debug)]
struct VariantPlan<'a> {
    mapped: Vec<(&'a ShopifyVariant, OptionNames)>,
    skipped: u32,
}

/// Map every variant's options, dropping variants that are incomplete or
/// that repeat an earlier variant's combination.
fn plan_variants(variants: &[ShopifyVariant]) -> VariantPlan<'_> {
    let mut mapped = Vec::with_capacity(variants.len());
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for variant in variants {
        match map_selected_options(&variant.selected_options) {
            Ok(names) => {
                let combination: Vec<String> = names.iter().map(|(_, v)| v.to_lowercase()).collect();
                if seen.insert(combination) {
                    mapped.push((variant, names));
                } else {
                    skipped += 1;
                    warn!(shopify_id = %variant.id, "Skipping variant with a repeated combination");
                }
            }
            Err(e) => {
                skipped += 1;
                debug!(shopify_id = %variant.id, error = %e, "Skipping variant");
            }
        }
    }

    VariantPlan { mapped, skipped }
}

/// Shopify handles are slugs already; anything else is re-slugged from the
/// handle, then from the title.
fn normalize_handle(product: &ShopifyProduct) -> Option<Handle> {
    let trimmed = product.handle.trim().to_ascii_lowercase();
    Handle::parse(&trimmed)
        .ok()
        .or_else(|| Handle::from_title(&product.handle))
        .or_else(|| Handle::from_title(&product.title))
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cobbler_core::ProductStatus;
    use rust_decimal::Decimal;

    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::ShopifyAdminConfig;
    use crate::shopify::{SelectedOption, ShopifySeo};

    /// A synchronizer whose pool and client are never reached.
    fn offline_sync() -> Arc<CatalogSync> {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://cobbler@127.0.0.1:1/cobbler")
            .unwrap();
        let client = AdminClient::new(&ShopifyAdminConfig {
            store: "cobbler.myshopify.com".to_owned(),
            api_version: "2026-01".to_owned(),
            access_token: SecretString::from("shpat_offline"),
            webhook_secret: None,
        })
        .unwrap();
        Arc::new(CatalogSync::new(pool, client))
    }

    fn variant(id: &str, color: &str, size: &str) -> ShopifyVariant {
        ShopifyVariant {
            id: format!("gid://shopify/ProductVariant/{id}"),
            sku: None,
            title: format!("{size} / {color}"),
            price: Decimal::new(18900, 2),
            compare_at_price: None,
            inventory_quantity: 3,
            selected_options: vec![
                SelectedOption::new("Material", "Suede"),
                SelectedOption::new("Color", color),
                SelectedOption::new("Sole", "Crepe"),
                SelectedOption::new("Style", "Chelsea"),
                SelectedOption::new("Size", size),
                SelectedOption::new("Panel", "Elastic"),
            ],
            image_id: None,
        }
    }

    fn product(handle: &str, title: &str) -> ShopifyProduct {
        ShopifyProduct {
            id: "gid://shopify/Product/7".to_owned(),
            handle: handle.to_owned(),
            title: title.to_owned(),
            description_html: String::new(),
            status: ProductStatus::Active,
            vendor: None,
            product_type: None,
            tags: vec![],
            seo: ShopifySeo::default(),
            images: vec![],
            variants: vec![],
        }
    }

    #[test]
    fn test_plan_skips_incomplete_variants() {
        let mut default_title = variant("3", "Black", "41");
        default_title.selected_options = vec![SelectedOption::new("Title", "Default Title")];
        let variants = vec![variant("1", "Oxblood", "42"), default_title, variant("2", "Black", "42")];

        let plan = plan_variants(&variants);
        assert_eq!(plan.skipped, 1);
        let ids: Vec<&str> = plan.mapped.iter().map(|(v, _)| v.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["gid://shopify/ProductVariant/1", "gid://shopify/ProductVariant/2"]
        );
    }

    #[test]
    fn test_plan_skips_repeated_combinations_ignoring_case() {
        let variants = vec![variant("1", "Oxblood", "42"), variant("2", "OXBLOOD", "42")];
        let plan = plan_variants(&variants);
        assert_eq!(plan.mapped.len(), 1);
        assert_eq!(plan.skipped, 1);
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(
            normalize_handle(&product("chelsea-boot", "x")).unwrap().as_str(),
            "chelsea-boot"
        );
        assert_eq!(
            normalize_handle(&product(" Chelsea-Boot ", "x")).unwrap().as_str(),
            "chelsea-boot"
        );
        assert_eq!(
            normalize_handle(&product("chelsea_boot!", "x")).unwrap().as_str(),
            "chelsea-boot"
        );
        assert_eq!(
            normalize_handle(&product("", "Derby Shoe")).unwrap().as_str(),
            "derby-shoe"
        );
        assert!(normalize_handle(&product("", "靴")).is_none());
    }

    #[test]
    fn test_tally_accumulates_into_report() {
        let mut report = SyncReport::default();
        let tally = ProductTally {
            variants: 4,
            images: 2,
            skipped_variants: 1,
            pruned_variants: 3,
        };
        tally.add_to(&mut report);
        tally.add_to(&mut report);
        assert_eq!(report.products, 2);
        assert_eq!(report.variants, 8);
        assert_eq!(report.images, 4);
        assert_eq!(report.skipped_variants, 2);
        assert_eq!(report.pruned_variants, 6);
        assert_eq!(report.failed_products, 0);
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(SyncTrigger::Schedule.to_string(), "schedule");
        assert_eq!(SyncTrigger::Cli.to_string(), "cli");
        assert_eq!(
            SyncTrigger::Manual {
                email: "ops@cobbler.test".to_owned()
            }
            .to_string(),
            "manual:ops@cobbler.test"
        );
        assert_eq!(
            SyncTrigger::Webhook {
                topic: "products/update".to_owned()
            }
            .to_string(),
            "webhook:products/update"
        );
        assert_eq!(SyncTrigger::Requeued.to_string(), "requeued");
    }

    #[tokio::test]
    async fn test_request_during_run_leaves_rerun_flag() {
        let sync = offline_sync();
        let _held = Arc::clone(&sync.lock).try_lock_owned().unwrap();

        let topic = "products/update".to_owned();
        assert!(!sync.request(SyncTrigger::Webhook { topic: topic.clone() }));
        assert!(!sync.request(SyncTrigger::Webhook { topic }));
        assert!(sync.is_running());
        assert!(sync.rerun_pending());

        // Manual triggers still refuse instead of queueing
        assert!(matches!(
            sync.try_spawn(SyncTrigger::Cli),
            Err(SyncError::AlreadyRunning)
        ));
    }

    #[tokio::test]
    async fn test_rerun_is_left_to_lock_holder() {
        let sync = offline_sync();
        sync.rerun.store(true, Ordering::SeqCst);
        let held = Arc::clone(&sync.lock).try_lock_owned().unwrap();

        // Someone else holds the lock, so the flag stays for them
        sync.run_requested().await;
        assert!(sync.rerun_pending());
        assert!(sync.is_running());

        drop(held);
        assert!(!sync.is_running());
    }

    #[tokio::test]
    async fn test_no_rerun_without_request() {
        let sync = offline_sync();

        sync.run_requested().await;

        assert!(!sync.rerun_pending());
        assert!(!sync.is_running());
    }

    #[test]
    fn test_already_running_message() {
        assert_eq!(
            SyncError::AlreadyRunning.to_string(),
            "a catalog sync is already running"
        );
    }
}
