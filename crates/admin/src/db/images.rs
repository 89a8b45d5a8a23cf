//! Product image repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use cobbler_core::{ImageId, ProductId, VariantId};

use super::{RepositoryError, map_db_error};
use crate::models::{NewImage, ProductImage};

const IMAGE_COLUMNS: &str = "id, product_id, variant_id, shopify_id, asset_public_id, url, \
                             alt_text, position, width, height, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i32,
    product_id: i32,
    variant_id: Option<i32>,
    shopify_id: Option<String>,
    asset_public_id: Option<String>,
    url: String,
    alt_text: Option<String>,
    position: i32,
    width: Option<i32>,
    height: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: ImageId::new(row.id),
            product_id: ProductId::new(row.product_id),
            variant_id: row.variant_id.map(VariantId::new),
            shopify_id: row.shopify_id,
            asset_public_id: row.asset_public_id,
            url: row.url,
            alt_text: row.alt_text,
            position: row.position,
            width: row.width,
            height: row.height,
            created_at: row.created_at,
        }
    }
}

/// Image fields as they arrive from Shopify.
#[derive(Debug, Clone)]
pub struct ImageUpsert<'a> {
    pub shopify_id: &'a str,
    pub url: &'a str,
    pub alt_text: Option<&'a str>,
    pub position: i32,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Repository for product images.
pub struct ImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Images of a product in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM catalog.product_image \
             WHERE product_id = $1 ORDER BY position, id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ImageId) -> Result<Option<ProductImage>, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM catalog.product_image WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Record an uploaded image at the end of the product's gallery.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product or variant does
    /// not exist, or the asset is already recorded.
    #[instrument(skip(self, image), fields(product_id = %image.product_id))]
    pub async fn create(&self, image: &NewImage) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            r"
            INSERT INTO catalog.product_image
                (product_id, variant_id, asset_public_id, url, alt_text, position, width, height)
            VALUES ($1, $2, $3, $4, $5,
                    (SELECT COALESCE(MAX(position) + 1, 0)
                     FROM catalog.product_image WHERE product_id = $1),
                    $6, $7)
            RETURNING {IMAGE_COLUMNS}
            "
        ))
        .bind(image.product_id)
        .bind(image.variant_id)
        .bind(&image.asset_public_id)
        .bind(&image.url)
        .bind(&image.alt_text)
        .bind(image.width)
        .bind(image.height)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            map_db_error(
                e,
                "this asset is already attached to a product",
                "the product or variant does not exist",
            )
        })?;

        Ok(row.into())
    }

    /// Delete an image and return what was removed, so the caller can
    /// destroy the hosted asset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not belong to
    /// `product_id`.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        product_id: ProductId,
        id: ImageId,
    ) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(&format!(
            "DELETE FROM catalog.product_image WHERE id = $1 AND product_id = $2 \
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product_image")
                .fetch_one(self.pool)
                .await?,
        )
    }

    /// Insert or update a synced image by Shopify ID.
    ///
    /// The variant pin is cleared; [`Self::assign_variant`] sets it again for
    /// images a variant still displays.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_from_shopify(
        conn: &mut PgConnection,
        product_id: ProductId,
        image: &ImageUpsert<'_>,
    ) -> Result<ImageId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO catalog.product_image
                (product_id, shopify_id, url, alt_text, position, width, height)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (shopify_id) DO UPDATE SET
                product_id = EXCLUDED.product_id,
                url = EXCLUDED.url,
                alt_text = EXCLUDED.alt_text,
                position = EXCLUDED.position,
                width = EXCLUDED.width,
                height = EXCLUDED.height,
                variant_id = NULL
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(image.shopify_id)
        .bind(image.url)
        .bind(image.alt_text)
        .bind(image.position)
        .bind(image.width)
        .bind(image.height)
        .fetch_one(&mut *conn)
        .await?;

        Ok(ImageId::new(id))
    }

    /// Delete synced images of a product whose Shopify IDs are not in
    /// `seen`. Uploaded images are kept.
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
            "DELETE FROM catalog.product_image \
             WHERE product_id = $1 AND shopify_id IS NOT NULL AND NOT (shopify_id = ANY($2))",
        )
        .bind(product_id)
        .bind(seen)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
    /// Point a synced image at the variant that displays it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn assign_variant(
        conn: &mut PgConnection,
        image_shopify_id: &str,
        variant_id: VariantId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE catalog.product_image SET variant_id = $2 WHERE shopify_id = $1")
            .bind(image_shopify_id)
            .bind(variant_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
