//! Option value repository (sizes, styles, soles, materials, colors, panels).
//!
//! The six option tables share one shape, so a single repository serves
//! them all. Table names come from [`OptionCategory::table`] and are never
//! user input.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use cobbler_core::{OptionCategory, Page};

use super::{ListQuery, RepositoryError, map_db_error};
use crate::models::{NewOption, OptionValue};

/// Columns option lists may be sorted by.
pub const SORT_COLUMNS: &[&str] = &["sort_order", "name", "created_at", "updated_at", "id"];

#[derive(Debug, sqlx::FromRow)]
struct OptionRow {
    id: i32,
    name: String,
    description: Option<String>,
    hex_code: Option<String>,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OptionRow {
    fn into_value(self, category: OptionCategory) -> OptionValue {
        OptionValue {
            id: self.id,
            category,
            name: self.name,
            description: self.description,
            hex_code: self.hex_code,
            sort_order: self.sort_order,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Select list for a category; non-color tables report a `NULL` hex code.
const fn select_columns(category: OptionCategory) -> &'static str {
    if category.has_hex_code() {
        "id, name, description, hex_code, sort_order, created_at, updated_at"
    } else {
        "id, name, description, NULL::text AS hex_code, sort_order, created_at, updated_at"
    }
}

fn duplicate_message(category: OptionCategory) -> String {
    format!("a {category} with this name already exists")
}

fn in_use_message(category: OptionCategory) -> String {
    format!("this {category} is used by at least one variant")
}

/// Repository for one option category.
pub struct OptionRepository<'a> {
    pool: &'a PgPool,
    category: OptionCategory,
}

impl<'a> OptionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, category: OptionCategory) -> Self {
        Self { pool, category }
    }

    /// List one page of values, optionally filtered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self), fields(category = %self.category))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<OptionValue>, RepositoryError> {
        let table = self.category.table();
        let pattern = query.search_pattern();

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table}"));
        push_name_filter(&mut count, pattern.as_deref());
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {table}",
            select_columns(self.category)
        ));
        push_name_filter(&mut select, pattern.as_deref());
        select.push(format!(
            " ORDER BY {} {}, id ASC LIMIT ",
            query.sort_column,
            query.direction.as_sql()
        ));
        select.push_bind(query.page.limit());
        select.push(" OFFSET ");
        select.push_bind(query.page.offset());

        let rows: Vec<OptionRow> = select.build_query_as().fetch_all(self.pool).await?;
        let items = rows
            .into_iter()
            .map(|row| row.into_value(self.category))
            .collect();

        Ok(Page::new(items, query.page, total))
    }

    /// All values in display order (`sort_order`, then name).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<OptionValue>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY sort_order, name",
            select_columns(self.category),
            self.category.table()
        );
        let rows = sqlx::query_as::<_, OptionRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_value(self.category))
            .collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: i32) -> Result<Option<OptionValue>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_columns(self.category),
            self.category.table()
        );
        let row = sqlx::query_as::<_, OptionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|row| row.into_value(self.category)))
    }

    /// Insert a validated value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    #[instrument(skip(self, option), fields(category = %self.category, name = %option.name))]
    pub async fn create(&self, option: &NewOption) -> Result<OptionValue, RepositoryError> {
        let table = self.category.table();
        let columns = select_columns(self.category);
        let sql = if self.category.has_hex_code() {
            format!(
                "INSERT INTO {table} (name, description, sort_order, hex_code) \
                 VALUES ($1, $2, $3, $4) RETURNING {columns}"
            )
        } else {
            format!(
                "INSERT INTO {table} (name, description, sort_order) \
                 VALUES ($1, $2, $3) RETURNING {columns}"
            )
        };

        let mut insert = sqlx::query_as::<_, OptionRow>(&sql)
            .bind(&option.name)
            .bind(&option.description)
            .bind(option.sort_order);
        if self.category.has_hex_code() {
            insert = insert.bind(&option.hex_code);
        }

        let row = insert.fetch_one(self.pool).await.map_err(|e| {
            map_db_error(
                e,
                &duplicate_message(self.category),
                &in_use_message(self.category),
            )
        })?;
        Ok(row.into_value(self.category))
    }

    /// Replace every editable field of a value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such value exists and
    /// `RepositoryError::Conflict` if the new name is taken.
    #[instrument(skip(self, option), fields(category = %self.category))]
    pub async fn update(&self, id: i32, option: &NewOption) -> Result<OptionValue, RepositoryError> {
        let table = self.category.table();
        let columns = select_columns(self.category);
        let sql = if self.category.has_hex_code() {
            format!(
                "UPDATE {table} SET name = $2, description = $3, sort_order = $4, hex_code = $5 \
                 WHERE id = $1 RETURNING {columns}"
            )
        } else {
            format!(
                "UPDATE {table} SET name = $2, description = $3, sort_order = $4 \
                 WHERE id = $1 RETURNING {columns}"
            )
        };

        let mut update = sqlx::query_as::<_, OptionRow>(&sql)
            .bind(id)
            .bind(&option.name)
            .bind(&option.description)
            .bind(option.sort_order);
        if self.category.has_hex_code() {
            update = update.bind(&option.hex_code);
        }

        let row = update.fetch_optional(self.pool).await.map_err(|e| {
            map_db_error(
                e,
                &duplicate_message(self.category),
                &in_use_message(self.category),
            )
        })?;
        row.map(|row| row.into_value(self.category))
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such value exists and
    /// `RepositoryError::Conflict` if a variant still references it.
    #[instrument(skip(self), fields(category = %self.category))]
    pub async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.category.table());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                map_db_error(
                    e,
                    &duplicate_message(self.category),
                    &in_use_message(self.category),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of values in this category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.category.table());
        Ok(sqlx::query_scalar(&sql).fetch_one(self.pool).await?)
    }

    /// Look up a value by name, ignoring case, inserting it when missing.
    ///
    /// New values are appended after the current highest `sort_order`.
    /// Runs on the caller's connection so sync can keep it inside the
    /// product transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn find_or_create_by_name(
        conn: &mut PgConnection,
        category: OptionCategory,
        name: &str,
    ) -> Result<i32, RepositoryError> {
        let table = category.table();
        let sql = format!(
            "INSERT INTO {table} AS t (name, sort_order) \
             VALUES ($1, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM {table})) \
             ON CONFLICT ((lower(name))) DO UPDATE SET name = t.name \
             RETURNING id"
        );
        let id: i32 = sqlx::query_scalar(&sql)
            .bind(name.trim())
            .fetch_one(&mut *conn)
            .await?;
        Ok(id)
    }
}

fn push_name_filter(builder: &mut QueryBuilder<'_, Postgres>, pattern: Option<&str>) {
    if let Some(pattern) = pattern {
        builder.push(" WHERE name ILIKE ");
        builder.push_bind(pattern.to_owned());
    }
}
