//! Product variant repository.
//!
//! Every variant row carries the six option foreign keys. The
//! `product_variant_combination_key` constraint guarantees a product never
//! has two variants with the same tuple, which is what lets
//! [`cobbler_core::VariantIndex`] resolve selections by exact match. The
//! constraint is checked at commit, so statements inside one transaction
//! may pass through a duplicate tuple while swapping two variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use cobbler_core::{
    ColorId, MaterialId, OptionKey, PanelId, ProductId, SizeId, SoleId, StyleId, VariantId,
};

use super::{RepositoryError, map_db_error};
use crate::models::{NewVariant, Variant};

const VARIANT_COLUMNS: &str = "id, product_id, shopify_id, sku, title, size_id, style_id, \
                               sole_id, material_id, color_id, panel_id, price, \
                               compare_at_price, inventory_quantity, created_at, updated_at";

const DUPLICATE_COMBINATION: &str = "this product already has a variant with these options";
const UNKNOWN_REFERENCE: &str = "the product or one of the selected options does not exist";

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    product_id: i32,
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
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VariantRow {
    const fn key(&self) -> OptionKey {
        OptionKey {
            size: SizeId::new(self.size_id),
            style: StyleId::new(self.style_id),
            sole: SoleId::new(self.sole_id),
            material: MaterialId::new(self.material_id),
            color: ColorId::new(self.color_id),
            panel: PanelId::new(self.panel_id),
        }
    }
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            product_id: ProductId::new(row.product_id),
            options: row.key(),
            shopify_id: row.shopify_id,
            sku: row.sku,
            title: row.title,
            price: row.price,
            compare_at_price: row.compare_at_price,
            inventory_quantity: row.inventory_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct KeyRow {
    id: i32,
    size_id: i32,
    style_id: i32,
    sole_id: i32,
    material_id: i32,
    color_id: i32,
    panel_id: i32,
}

/// Variant fields as they arrive from Shopify, with options already mapped
/// to local IDs.
#[derive(Debug, Clone)]
pub struct VariantUpsert<'a> {
    pub shopify_id: &'a str,
    pub sku: Option<&'a str>,
    pub title: &'a str,
    pub options: OptionKey,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub inventory_quantity: i32,
}

/// Repository for variant database operations.
pub struct VariantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VariantRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant \
             WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a local variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product already has a
    /// variant with this option tuple, or an option ID does not exist.
    #[instrument(skip(self, variant), fields(options = %variant.options))]
    pub async fn create(
        &self,
        product_id: ProductId,
        variant: &NewVariant,
    ) -> Result<Variant, RepositoryError> {
        let key = variant.options;
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            r"
            INSERT INTO catalog.product_variant
                (product_id, sku, title, size_id, style_id, sole_id, material_id, color_id,
                 panel_id, price, compare_at_price, inventory_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(product_id)
        .bind(&variant.sku)
        .bind(&variant.title)
        .bind(key.size)
        .bind(key.style)
        .bind(key.sole)
        .bind(key.material)
        .bind(key.color)
        .bind(key.panel)
        .bind(variant.price)
        .bind(variant.compare_at_price)
        .bind(variant.inventory_quantity)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_COMBINATION, UNKNOWN_REFERENCE))?;

        Ok(row.into())
    }

    /// Replace the editable fields of a variant, including its options.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist and
    /// `RepositoryError::Conflict` for a duplicate tuple or unknown option.
    #[instrument(skip(self, variant))]
    pub async fn update(&self, id: VariantId, variant: &NewVariant) -> Result<Variant, RepositoryError> {
        let key = variant.options;
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            r"
            UPDATE catalog.product_variant
            SET sku = $2, title = $3, size_id = $4, style_id = $5, sole_id = $6,
                material_id = $7, color_id = $8, panel_id = $9, price = $10,
                compare_at_price = $11, inventory_quantity = $12
            WHERE id = $1
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&variant.sku)
        .bind(&variant.title)
        .bind(key.size)
        .bind(key.style)
        .bind(key.sole)
        .bind(key.material)
        .bind(key.color)
        .bind(key.panel)
        .bind(variant.price)
        .bind(variant.compare_at_price)
        .bind(variant.inventory_quantity)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_COMBINATION, UNKNOWN_REFERENCE))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: VariantId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product_variant WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Variant IDs and option tuples of a product, for building a
    /// [`cobbler_core::VariantIndex`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn keys_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<(VariantId, OptionKey)>, RepositoryError> {
        let rows = sqlx::query_as::<_, KeyRow>(
            "SELECT id, size_id, style_id, sole_id, material_id, color_id, panel_id \
             FROM catalog.product_variant WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let key = OptionKey {
                    size: SizeId::new(r.size_id),
                    style: StyleId::new(r.style_id),
                    sole: SoleId::new(r.sole_id),
                    material: MaterialId::new(r.material_id),
                    color: ColorId::new(r.color_id),
                    panel: PanelId::new(r.panel_id),
                };
                (VariantId::new(r.id), key)
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product_variant")
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// Insert or update a variant by Shopify ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a local variant of the same
    /// product already holds this option tuple.
    pub async fn upsert_from_shopify(
        conn: &mut PgConnection,
        product_id: ProductId,
        variant: &VariantUpsert<'_>,
    ) -> Result<VariantId, RepositoryError> {
        let key = variant.options;
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO catalog.product_variant
                (product_id, shopify_id, sku, title, size_id, style_id, sole_id, material_id,
                 color_id, panel_id, price, compare_at_price, inventory_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (shopify_id) DO UPDATE SET
                product_id = EXCLUDED.product_id,
                sku = EXCLUDED.sku,
                title = EXCLUDED.title,
                size_id = EXCLUDED.size_id,
                style_id = EXCLUDED.style_id,
                sole_id = EXCLUDED.sole_id,
                material_id = EXCLUDED.material_id,
                color_id = EXCLUDED.color_id,
                panel_id = EXCLUDED.panel_id,
                price = EXCLUDED.price,
                compare_at_price = EXCLUDED.compare_at_price,
                inventory_quantity = EXCLUDED.inventory_quantity
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(variant.shopify_id)
        .bind(variant.sku)
        .bind(variant.title)
        .bind(key.size)
        .bind(key.style)
        .bind(key.sole)
        .bind(key.material)
        .bind(key.color)
        .bind(key.panel)
        .bind(variant.price)
        .bind(variant.compare_at_price)
        .bind(variant.inventory_quantity)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_COMBINATION, UNKNOWN_REFERENCE))?;

        Ok(VariantId::new(id))
    }

    /// Delete synced variants of a product whose Shopify IDs are not in
    /// `seen`. Local variants (no Shopify ID) are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn prune_unseen(
        conn: &mut PgConnection,
        product_id: ProductId,
        seen: &[String],
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM catalog.product_variant \
             WHERE product_id = $1 AND shopify_id IS NOT NULL AND NOT (shopify_id = ANY($2))",
        )
        .bind(product_id)
        .bind(seen)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
