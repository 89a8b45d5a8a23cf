//! Product repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use cobbler_core::{Handle, Page, ProductId, ProductStatus};

use super::{ListQuery, RepositoryError, map_db_error};
use crate::models::{NewProduct, Product};

/// Columns product lists may be sorted by.
pub const SORT_COLUMNS: &[&str] = &[
    "updated_at",
    "title",
    "handle",
    "status",
    "created_at",
    "synced_at",
    "id",
];

const PRODUCT_COLUMNS: &str = "id, shopify_id, handle, title, description_html, status, vendor, \
                               product_type, tags, created_at, updated_at, synced_at";

const DUPLICATE_HANDLE: &str = "a product with this handle already exists";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    shopify_id: Option<String>,
    handle: String,
    title: String,
    description_html: String,
    status: ProductStatus,
    vendor: Option<String>,
    product_type: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let handle = Handle::parse(&row.handle).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid handle in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            shopify_id: row.shopify_id,
            handle,
            title: row.title,
            description_html: row.description_html,
            status: row.status,
            vendor: row.vendor,
            product_type: row.product_type,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
            synced_at: row.synced_at,
        })
    }
}

/// Product fields as they arrive from Shopify.
#[derive(Debug, Clone)]
pub struct ProductUpsert<'a> {
    pub shopify_id: &'a str,
    pub handle: &'a Handle,
    pub title: &'a str,
    pub description_html: &'a str,
    pub status: ProductStatus,
    pub vendor: Option<&'a str>,
    pub product_type: Option<&'a str>,
    pub tags: &'a [String],
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List one page of products, optionally filtered by status and a
    /// title/handle search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails and
    /// `RepositoryError::DataCorruption` if a stored handle is invalid.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ListQuery,
        status: Option<ProductStatus>,
    ) -> Result<Page<Product>, RepositoryError> {
        let pattern = query.search_pattern();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.product");
        push_filters(&mut count, status, pattern.as_deref());
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product"));
        push_filters(&mut select, status, pattern.as_deref());
        select.push(format!(
            " ORDER BY {} {} NULLS LAST, id ASC LIMIT ",
            query.sort_column,
            query.direction.as_sql()
        ));
        select.push_bind(query.page.limit());
        select.push(" OFFSET ");
        select.push_bind(query.page.offset());

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool).await?;
        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, query.page, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_handle(&self, handle: &Handle) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product WHERE handle = $1"
        ))
        .bind(handle.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a local product (no Shopify ID).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the handle is taken.
    #[instrument(skip(self, product), fields(handle = %product.handle))]
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO catalog.product
                (handle, title, description_html, status, vendor, product_type, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.handle.as_str())
        .bind(&product.title)
        .bind(&product.description_html)
        .bind(product.status)
        .bind(&product.vendor)
        .bind(&product.product_type)
        .bind(&product.tags)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_HANDLE, DUPLICATE_HANDLE))?;

        row.try_into()
    }

    /// Replace the editable fields of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the new handle is taken.
    #[instrument(skip(self, product))]
    pub async fn update(&self, id: ProductId, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE catalog.product
            SET handle = $2, title = $3, description_html = $4, status = $5,
                vendor = $6, product_type = $7, tags = $8
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(product.handle.as_str())
        .bind(&product.title)
        .bind(&product.description_html)
        .bind(product.status)
        .bind(&product.vendor)
        .bind(&product.product_type)
        .bind(&product.tags)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_HANDLE, DUPLICATE_HANDLE))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a product. Variants, images and SEO rows cascade.
    ///
    /// Returns the asset IDs of uploaded images so the caller can clean up
    /// the asset host.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let assets: Vec<String> = sqlx::query_scalar(
            "SELECT asset_public_id FROM catalog.product_image \
             WHERE product_id = $1 AND asset_public_id IS NOT NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM catalog.product WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(assets)
    }

    /// Number of products, optionally with a given status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, status: Option<ProductStatus>) -> Result<i64, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.product");
        push_filters(&mut count, status, None);
        Ok(count.build_query_scalar().fetch_one(self.pool).await?)
    }

    /// Insert or update a product by Shopify ID.
    ///
    /// A local product that already owns the handle is adopted: it gains
    /// the Shopify ID instead of causing a handle conflict.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_from_shopify(
        conn: &mut PgConnection,
        product: &ProductUpsert<'_>,
    ) -> Result<ProductId, RepositoryError> {
        let adopted: Option<i32> = sqlx::query_scalar(
            "UPDATE catalog.product SET shopify_id = $1 \
             WHERE handle = $2 AND shopify_id IS NULL RETURNING id",
        )
        .bind(product.shopify_id)
        .bind(product.handle.as_str())
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(id) = adopted {
            tracing::info!(product_id = id, handle = %product.handle, "Adopted local product");
        }

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO catalog.product
                (shopify_id, handle, title, description_html, status, vendor, product_type, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (shopify_id) DO UPDATE SET
                handle = EXCLUDED.handle,
                title = EXCLUDED.title,
                description_html = EXCLUDED.description_html,
                status = EXCLUDED.status,
                vendor = EXCLUDED.vendor,
                product_type = EXCLUDED.product_type,
                tags = EXCLUDED.tags
            RETURNING id
            ",
        )
        .bind(product.shopify_id)
        .bind(product.handle.as_str())
        .bind(product.title)
        .bind(product.description_html)
        .bind(product.status)
        .bind(product.vendor)
        .bind(product.product_type)
        .bind(product.tags)
        .fetch_one(&mut *conn)
        .await?;

        Ok(ProductId::new(id))
    }

    /// Stamp `synced_at` after a product's sync transaction has applied.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn mark_synced(conn: &mut PgConnection, id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE catalog.product SET synced_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    status: Option<ProductStatus>,
    pattern: Option<&str>,
) {
    let mut separator = " WHERE ";
    if let Some(status) = status {
        builder.push(separator);
        builder.push("status = ");
        builder.push_bind(status);
        separator = " AND ";
    }
    if let Some(pattern) = pattern {
        builder.push(separator);
        builder.push("(title ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR handle ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(")");
    }
}
