//! The product configurator.
//!
//! A [`ProductConfiguration`] is everything needed to answer selections for
//! one product: its option values per category, its variants and images,
//! and a [`VariantIndex`] over the variants. Configurations are cached by
//! handle, so repeated selections on the same product cost no queries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument};

use cobbler_core::{
    Combination, CurrencyCode, IndexError, OptionCategory, Price, Resolution, VariantId,
    VariantIndex, numeric_id,
};

use crate::db::{CatalogRepository, RepositoryError};
use crate::models::{CatalogImage, CatalogOption, CatalogProduct, CatalogVariant};

const CACHE_CAPACITY: u64 = 1000;

/// Largest quantity the checkout redirect accepts.
pub const MAX_CHECKOUT_QUANTITY: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfiguratorError {
    #[error("product not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("catalog is inconsistent: {0}")]
    Index(#[from] IndexError),
}

/// Everything needed to resolve selections for one product.
#[derive(Debug)]
pub struct ProductConfiguration {
    pub product: CatalogProduct,
    /// Option values per category, in [`OptionCategory::ALL`] order.
    pub options: Vec<(OptionCategory, Vec<CatalogOption>)>,
    pub variants: HashMap<VariantId, CatalogVariant>,
    pub images: Vec<CatalogImage>,
    pub index: VariantIndex,
}

impl ProductConfiguration {
    /// Group options by category and index the variants.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] if two variants share an option tuple.
    pub fn assemble(
        product: CatalogProduct,
        options: Vec<CatalogOption>,
        variants: Vec<CatalogVariant>,
        images: Vec<CatalogImage>,
    ) -> Result<Self, IndexError> {
        let index = VariantIndex::build(variants.iter().map(|v| (v.id, v.options)))?;

        let mut grouped: Vec<(OptionCategory, Vec<CatalogOption>)> = OptionCategory::ALL
            .into_iter()
            .map(|c| (c, Vec::new()))
            .collect();
        for option in options {
            if let Some((_, values)) = grouped.iter_mut().find(|(c, _)| *c == option.category) {
                values.push(option);
            }
        }

        Ok(Self {
            product,
            options: grouped,
            variants: variants.into_iter().map(|v| (v.id, v)).collect(),
            images,
            index,
        })
    }

    /// Answer a selection: resolution state, matched variant, per-category
    /// choices with availability, and the images to show.
    #[must_use]
    pub fn view(&self, combo: &Combination, store: &str) -> ConfiguratorView {
        let resolution = self.index.resolve(combo);
        let variant_id = resolution.variant_id();
        let variant = variant_id
            .and_then(|id| self.variants.get(&id))
            .map(|v| VariantView::new(v, store));

        let categories = self
            .options
            .iter()
            .map(|(category, values)| {
                let available = self.index.available_values(combo, *category);
                let selected = combo.get(*category);
                CategoryView {
                    category: *category,
                    label: category.label(),
                    selected,
                    choices: values
                        .iter()
                        .map(|o| OptionChoice {
                            id: o.id,
                            name: o.name.clone(),
                            hex_code: o.hex_code.clone(),
                            selected: selected == Some(o.id),
                            available: available.contains(&o.id),
                            query: combo.with(*category, o.id).to_query(),
                        })
                        .collect(),
                }
            })
            .collect();

        ConfiguratorView {
            handle: self.product.handle.clone(),
            title: self.product.title.clone(),
            description_html: self.product.description_html.clone(),
            seo_title: self
                .product
                .seo_title
                .clone()
                .unwrap_or_else(|| self.product.title.clone()),
            seo_description: self.product.seo_description.clone(),
            state: resolution.state(),
            missing: match resolution {
                Resolution::Incomplete { missing } => missing,
                _ => Vec::new(),
            },
            query: combo.to_query(),
            variant,
            categories,
            images: self.images_for(variant_id),
        }
    }

    /// The variant's own images if it has any, otherwise the product's.
    fn images_for(&self, variant: Option<VariantId>) -> Vec<ImageView> {
        let pinned: Vec<&CatalogImage> = variant
            .map(|id| {
                self.images
                    .iter()
                    .filter(|i| i.variant_id == Some(id))
                    .collect()
            })
            .unwrap_or_default();

        let chosen: Vec<&CatalogImage> = if pinned.is_empty() {
            self.images.iter().collect()
        } else {
            pinned
        };
        chosen
            .into_iter()
            .map(|i| ImageView {
                url: i.url.clone(),
                alt: i
                    .alt_text
                    .clone()
                    .unwrap_or_else(|| self.product.title.clone()),
            })
            .collect()
    }
}

/// Shopify cart permalink for a synced variant.
///
/// `shopify_id` is the variant GID written by the sync
/// (`gid://shopify/ProductVariant/123`). Returns `None` if it carries no
/// numeric ID.
#[must_use]
pub fn checkout_url(store: &str, shopify_id: &str, quantity: u32) -> Option<String> {
    let numeric = numeric_id(shopify_id)?;
    Some(format!("https://{store}/cart/{numeric}:{quantity}"))
}

fn display_price(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::default()).display()
}

/// Response for a selection, rendered as HTML or JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ConfiguratorView {
    pub handle: String,
    pub title: String,
    pub description_html: String,
    pub seo_title: String,
    pub seo_description: Option<String>,
    /// `available`, `unavailable` or `incomplete`.
    pub state: &'static str,
    pub missing: Vec<OptionCategory>,
    /// The current selection as a query string.
    pub query: String,
    pub variant: Option<VariantView>,
    pub categories: Vec<CategoryView>,
    pub images: Vec<ImageView>,
}

impl ConfiguratorView {
    #[must_use]
    pub fn missing_labels(&self) -> String {
        self.missing
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantView {
    pub id: VariantId,
    pub sku: Option<String>,
    pub title: String,
    pub price: Decimal,
    pub price_display: String,
    pub compare_at_price: Option<Decimal>,
    pub compare_at_display: Option<String>,
    pub inventory_quantity: i32,
    pub in_stock: bool,
    pub checkout_url: Option<String>,
}

impl VariantView {
    fn new(variant: &CatalogVariant, store: &str) -> Self {
        // Only a real markdown gets the strike-through price.
        let compare_at = variant.compare_at_price.filter(|c| *c > variant.price);
        Self {
            id: variant.id,
            sku: variant.sku.clone(),
            title: variant.title.clone(),
            price: variant.price,
            price_display: display_price(variant.price),
            compare_at_price: compare_at,
            compare_at_display: compare_at.map(display_price),
            inventory_quantity: variant.inventory_quantity,
            in_stock: variant.inventory_quantity > 0,
            checkout_url: variant
                .shopify_id
                .as_deref()
                .and_then(|id| checkout_url(store, id, 1)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub category: OptionCategory,
    pub label: &'static str,
    pub selected: Option<i32>,
    pub choices: Vec<OptionChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionChoice {
    pub id: i32,
    pub name: String,
    pub hex_code: Option<String>,
    pub selected: bool,
    /// Some variant matches the rest of the selection with this value.
    pub available: bool,
    /// Query string selecting this value on top of the current selection.
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

/// Loads and caches product configurations.
#[derive(Clone)]
pub struct Configurator {
    inner: Arc<ConfiguratorInner>,
}

struct ConfiguratorInner {
    pool: PgPool,
    store: String,
    cache: Cache<String, Arc<ProductConfiguration>>,
}

impl Configurator {
    #[must_use]
    pub fn new(pool: PgPool, store: String, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self {
            inner: Arc::new(ConfiguratorInner { pool, store, cache }),
        }
    }

    /// Shopify store domain used for checkout links.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// Load the configuration for `handle`, from cache when possible.
    ///
    /// # Errors
    ///
    /// Returns [`ConfiguratorError::NotFound`] for an unknown or inactive
    /// product.
    #[instrument(skip(self))]
    pub async fn load(&self, handle: &str) -> Result<Arc<ProductConfiguration>, ConfiguratorError> {
        if let Some(config) = self.inner.cache.get(handle).await {
            debug!("Cache hit for product configuration");
            return Ok(config);
        }

        let catalog = CatalogRepository::new(&self.inner.pool);
        let product = catalog
            .get_product_by_handle(handle)
            .await?
            .ok_or_else(|| ConfiguratorError::NotFound(handle.to_owned()))?;

        let (options, variants, images) = tokio::try_join!(
            catalog.options_for_product(product.id),
            catalog.variants_for_product(product.id),
            catalog.images_for_product(product.id),
        )?;

        let config = Arc::new(ProductConfiguration::assemble(
            product, options, variants, images,
        )?);
        self.inner
            .cache
            .insert(handle.to_owned(), Arc::clone(&config))
            .await;
        Ok(config)
    }

    /// Resolve `combo` against the product at `handle`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub async fn configure(
        &self,
        handle: &str,
        combo: &Combination,
    ) -> Result<ConfiguratorView, ConfiguratorError> {
        let config = self.load(handle).await?;
        Ok(config.view(combo, &self.inner.store))
    }
}
