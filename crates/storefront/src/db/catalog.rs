//! Catalog queries. Only `active` products are visible.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use cobbler_core::{
    ColorId, ImageId, MaterialId, OptionCategory, OptionKey, Page, PageRequest, PanelId,
    ProductId, SizeId, SoleId, StyleId, VariantId,
};

use super::RepositoryError;
use crate::models::{
    CatalogImage, CatalogOption, CatalogProduct, CatalogVariant, CheckoutVariant, ProductSummary,
};

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: i32,
    handle: String,
    title: String,
    from_price: Option<Decimal>,
    image_url: Option<String>,
    image_alt: Option<String>,
    total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    handle: String,
    title: String,
    description_html: String,
    vendor: Option<String>,
    seo_title: Option<String>,
    seo_description: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionRow {
    category: String,
    id: i32,
    name: String,
    hex_code: Option<String>,
    sort_order: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    shopify_id: Option<String>,
    sku: Option<String>,
    title: String,
    size_id: i32,
    style_id: i32,
    sole_id: i32,
    material_id: i32,
    color_id: i32,
    panel_id: i32,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    inventory_quantity: i32,
}

impl From<VariantRow> for CatalogVariant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            options: OptionKey {
                size: SizeId::new(row.size_id),
                style: StyleId::new(row.style_id),
                sole: SoleId::new(row.sole_id),
                material: MaterialId::new(row.material_id),
                color: ColorId::new(row.color_id),
                panel: PanelId::new(row.panel_id),
            },
            shopify_id: row.shopify_id,
            sku: row.sku,
            title: row.title,
            price: row.price,
            compare_at_price: row.compare_at_price,
            inventory_quantity: row.inventory_quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i32,
    variant_id: Option<i32>,
    url: String,
    alt_text: Option<String>,
    position: i32,
}

/// `UNION ALL` over the six option tables, restricted to values used by
/// the variants of product `$1`.
fn options_sql() -> String {
    let mut sql = String::new();
    for (i, category) in OptionCategory::ALL.into_iter().enumerate() {
        if i > 0 {
            sql.push_str(" UNION ALL ");
        }
        let hex = if category.has_hex_code() {
            "o.hex_code"
        } else {
            "NULL::TEXT"
        };
        let _ = write!(
            sql,
            "SELECT '{category}' AS category, o.id, o.name, {hex} AS hex_code, o.sort_order \
             FROM {table} o WHERE o.id IN \
             (SELECT {column} FROM catalog.product_variant WHERE product_id = $1)",
            table = category.table(),
            column = category.variant_column(),
        );
    }
    sql.push_str(" ORDER BY sort_order, name, id");
    sql
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of active products, newest first, each with its lowest
    /// variant price and first image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        request: PageRequest,
    ) -> Result<Page<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT p.id, p.handle, p.title, \
                    (SELECT MIN(v.price) FROM catalog.product_variant v \
                     WHERE v.product_id = p.id) AS from_price, \
                    img.url AS image_url, img.alt_text AS image_alt, \
                    COUNT(*) OVER () AS total \
             FROM catalog.product p \
             LEFT JOIN LATERAL ( \
                 SELECT i.url, i.alt_text FROM catalog.product_image i \
                 WHERE i.product_id = p.id ORDER BY i.position, i.id LIMIT 1 \
             ) img ON TRUE \
             WHERE p.status = 'active' \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $1 OFFSET $2",
        )
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(self.pool)
        .await?;

        let total = match rows.first() {
            Some(row) => row.total,
            None => self.count_active().await?,
        };
        let items = rows
            .into_iter()
            .map(|r| ProductSummary {
                id: ProductId::new(r.id),
                handle: r.handle,
                title: r.title,
                from_price: r.from_price,
                image_url: r.image_url,
                image_alt: r.image_alt,
            })
            .collect();

        Ok(Page::new(items, request, total))
    }

    async fn count_active(&self) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product WHERE status = 'active'")
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_product_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<CatalogProduct>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT p.id, p.handle, p.title, p.description_html, p.vendor, \
                    s.title AS seo_title, s.description AS seo_description \
             FROM catalog.product p \
             LEFT JOIN catalog.product_seo s ON s.product_id = p.id \
             WHERE p.handle = $1 AND p.status = 'active'",
        )
        .bind(handle)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| CatalogProduct {
            id: ProductId::new(r.id),
            handle: r.handle,
            title: r.title,
            description_html: r.description_html,
            vendor: r.vendor,
            seo_title: r.seo_title,
            seo_description: r.seo_description,
        }))
    }

    /// Distinct option values referenced by the product's variants, ordered
    /// by `sort_order` then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a row names an unknown
    /// category, `RepositoryError::Database` if the query fails.
    pub async fn options_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CatalogOption>, RepositoryError> {
        let rows = sqlx::query_as::<_, OptionRow>(&options_sql())
            .bind(product_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter()
            .map(|r| {
                let category = r.category.parse::<OptionCategory>().map_err(|_| {
                    RepositoryError::DataCorruption(format!("unknown category {:?}", r.category))
                })?;
                Ok(CatalogOption {
                    category,
                    id: r.id,
                    name: r.name,
                    hex_code: r.hex_code,
                    sort_order: r.sort_order,
                })
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CatalogVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(
            "SELECT id, shopify_id, sku, title, size_id, style_id, sole_id, material_id, \
                    color_id, panel_id, price, compare_at_price, inventory_quantity \
             FROM catalog.product_variant WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CatalogImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT id, variant_id, url, alt_text, position FROM catalog.product_image \
             WHERE product_id = $1 ORDER BY position, id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CatalogImage {
                id: ImageId::new(r.id),
                variant_id: r.variant_id.map(VariantId::new),
                url: r.url,
                alt_text: r.alt_text,
                position: r.position,
            })
            .collect())
    }

    /// A variant of an active product, for the checkout redirect.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn checkout_variant(
        &self,
        id: VariantId,
    ) -> Result<Option<CheckoutVariant>, RepositoryError> {
        let row: Option<(i32, Option<String>)> = sqlx::query_as(
            "SELECT v.id, v.shopify_id FROM catalog.product_variant v \
             JOIN catalog.product p ON p.id = v.product_id \
             WHERE v.id = $1 AND p.status = 'active'",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, shopify_id)| CheckoutVariant {
            id: VariantId::new(id),
            shopify_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_sql_covers_every_category() {
        let sql = options_sql();
        for category in OptionCategory::ALL {
            assert!(sql.contains(&format!("'{category}' AS category")));
            assert!(sql.contains(category.table()));
            assert!(sql.contains(category.variant_column()));
        }
        assert_eq!(sql.matches("UNION ALL").count(), 5);
        assert!(sql.contains("o.hex_code AS hex_code"));
        assert!(sql.ends_with("ORDER BY sort_order, name, id"));
    }
}
