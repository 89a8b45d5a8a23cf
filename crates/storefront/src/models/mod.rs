//! Read models for the public catalog.
//!
//! The storefront never writes the catalog. These types carry only what a
//! customer-facing page needs.

use rust_decimal::Decimal;
use serde::Serialize;

use cobbler_core::{ImageId, OptionCategory, OptionKey, ProductId, VariantId};

/// An active product as listed on `/products`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    /// Lowest variant price, `None` for a product without variants.
    pub from_price: Option<Decimal>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
}

/// An active product with its SEO fields.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub description_html: String,
    pub vendor: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
}

/// One option value used by at least one of a product's variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogOption {
    pub category: OptionCategory,
    pub id: i32,
    pub name: String,
    pub hex_code: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogVariant {
    pub id: VariantId,
    pub shopify_id: Option<String>,
    pub sku: Option<String>,
    pub title: String,
    pub options: OptionKey,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub inventory_quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogImage {
    pub id: ImageId,
    pub variant_id: Option<VariantId>,
    pub url: String,
    pub alt_text: Option<String>,
    pub position: i32,
}

/// What the checkout redirect needs to know about a variant.
#[derive(Debug, Clone)]
pub struct CheckoutVariant {
    pub id: VariantId,
    pub shopify_id: Option<String>,
}
