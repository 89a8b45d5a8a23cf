//! Collection repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use cobbler_core::{CollectionId, Page};

use super::{ListQuery, RepositoryError};
use crate::models::Collection;

/// Columns collection lists may be sorted by.
pub const SORT_COLUMNS: &[&str] = &["title", "handle", "product_count", "synced_at", "id"];

#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    id: i32,
    shopify_id: String,
    handle: String,
    title: String,
    description_html: String,
    product_count: i64,
    synced_at: DateTime<Utc>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: CollectionId::new(row.id),
            shopify_id: row.shopify_id,
            handle: row.handle,
            title: row.title,
            description_html: row.description_html,
            product_count: row.product_count,
            synced_at: row.synced_at,
        }
    }
}

/// Collection fields as they arrive from Shopify.
#[derive(Debug, Clone)]
pub struct CollectionUpsert<'a> {
    pub shopify_id: &'a str,
    pub handle: &'a str,
    pub title: &'a str,
    pub description_html: &'a str,
}

pub struct CollectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List one page of collections with their local product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Collection>, RepositoryError> {
        let pattern = query.search_pattern();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.collection c");
        push_search(&mut count, pattern.as_deref());
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            r"
            SELECT c.id, c.shopify_id, c.handle, c.title, c.description_html, c.synced_at,
                   (SELECT COUNT(*) FROM catalog.collection_product cp
                    WHERE cp.collection_id = c.id) AS product_count
            FROM catalog.collection c
            ",
        );
        push_search(&mut select, pattern.as_deref());
        // product_count is an output alias, the rest are qualified columns
        let sort = if query.sort_column == "product_count" {
            "product_count".to_owned()
        } else {
            format!("c.{}", query.sort_column)
        };
        select.push(format!(
            " ORDER BY {sort} {}, c.id ASC LIMIT ",
            query.direction.as_sql()
        ));
        select.push_bind(query.page.limit());
        select.push(" OFFSET ");
        select.push_bind(query.page.offset());

        let rows: Vec<CollectionRow> = select.build_query_as().fetch_all(self.pool).await?;
        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            query.page,
            total,
        ))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM catalog.collection")
            .fetch_one(self.pool)
            .await?)
    }

    /// Insert or update a collection by Shopify ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn upsert_from_shopify(
        conn: &mut PgConnection,
        collection: &CollectionUpsert<'_>,
    ) -> Result<CollectionId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO catalog.collection (shopify_id, handle, title, description_html)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shopify_id) DO UPDATE SET
                handle = EXCLUDED.handle,
                title = EXCLUDED.title,
                description_html = EXCLUDED.description_html,
                synced_at = now()
            RETURNING id
            ",
        )
        .bind(collection.shopify_id)
        .bind(collection.handle)
        .bind(collection.title)
        .bind(collection.description_html)
        .fetch_one(&mut *conn)
        .await?;

        Ok(CollectionId::new(id))
    }

    /// Replace a collection's members with the given Shopify product IDs,
    /// in order. IDs with no local product are ignored.
    ///
    /// Returns the number of memberships written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails.
    pub async fn replace_products(
        conn: &mut PgConnection,
        collection_id: CollectionId,
        product_shopify_ids: &[String],
    ) -> Result<u64, RepositoryError> {
        sqlx::query("DELETE FROM catalog.collection_product WHERE collection_id = $1")
            .bind(collection_id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query(
            r"
            INSERT INTO catalog.collection_product (collection_id, product_id, position)
            SELECT $1, p.id, (ids.ord - 1)::integer
            FROM unnest($2::text[]) WITH ORDINALITY AS ids(shopify_id, ord)
            JOIN catalog.product p ON p.shopify_id = ids.shopify_id
            ON CONFLICT (collection_id, product_id) DO NOTHING
            ",
        )
        .bind(collection_id)
        .bind(product_shopify_ids)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}

fn push_search(builder: &mut QueryBuilder<'_, Postgres>, pattern: Option<&str>) {
    if let Some(pattern) = pattern {
        builder.push(" WHERE (c.title ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(" OR c.handle ILIKE ");
        builder.push_bind(pattern.to_owned());
        builder.push(")");
    }
}
