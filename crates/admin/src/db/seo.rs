//! Product SEO metadata.

use sqlx::{PgConnection, PgPool};

use cobbler_core::ProductId;

use super::{RepositoryError, map_db_error};
use crate::models::ProductSeo;

#[derive(Debug, sqlx::FromRow)]
struct SeoRow {
    title: Option<String>,
    description: Option<String>,
}

pub struct SeoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SeoRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// SEO fields for a product; empty when none have been set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, product_id: ProductId) -> Result<ProductSeo, RepositoryError> {
        let row = sqlx::query_as::<_, SeoRow>(
            "SELECT title, description FROM catalog.product_seo WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map_or_else(ProductSeo::default, |r| ProductSeo {
            title: r.title,
            description: r.description,
        }))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn upsert(
        &self,
        product_id: ProductId,
        seo: &ProductSeo,
    ) -> Result<ProductSeo, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, product_id, seo).await?;
        Ok(seo.clone())
    }

    /// Write SEO fields on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn upsert_in(
        conn: &mut PgConnection,
        product_id: ProductId,
        seo: &ProductSeo,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.product_seo (product_id, title, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description
            ",
        )
        .bind(product_id)
        .bind(&seo.title)
        .bind(&seo.description)
        .execute(&mut *conn)
        .await
        .map_err(|e| match map_db_error(e, "", "") {
            RepositoryError::Conflict(_) => RepositoryError::NotFound,
            other => other,
        })?;
        Ok(())
    }
}
