//! Domain types for the Shopify catalog.
//!
//! These types provide a clean API separate from the raw GraphQL response
//! shapes in [`super::queries`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cobbler_core::ProductStatus;

// =============================================================================
// Pagination
// =============================================================================

/// Cursor pagination info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Cursor for the last item.
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor to request the next page with, if there is one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
}

// =============================================================================
// Products
// =============================================================================

/// A product as Shopify reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyProduct {
    /// Product GID (`gid://shopify/Product/...`).
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description_html: String,
    pub status: ProductStatus,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub seo: ShopifySeo,
    pub images: Vec<ShopifyImage>,
    pub variants: Vec<ShopifyVariant>,
}

/// Search engine title and description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopifySeo {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopifyImage {
    /// Image GID.
    pub id: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// A `name: value` option pair on a variant, e.g. `Color: Oxblood`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

impl SelectedOption {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopifyVariant {
    /// Variant GID.
    pub id: String,
    pub sku: Option<String>,
    pub title: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub inventory_quantity: i32,
    pub selected_options: Vec<SelectedOption>,
    /// GID of the variant's own image, if one is assigned.
    pub image_id: Option<String>,
}

// =============================================================================
// Collections
// =============================================================================

/// A collection and the GIDs of its products, in collection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopifyCollection {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description_html: String,
    pub product_ids: Vec<String>,
}
