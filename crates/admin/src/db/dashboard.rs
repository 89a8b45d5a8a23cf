//! Entity counts for the dashboard.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::PgPool;

use cobbler_core::{OptionCategory, ProductStatus};

use super::{
    CollectionRepository, ImageRepository, OptionRepository, ProductRepository, RepositoryError,
    VariantRepository,
};

/// Headline numbers shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub products: i64,
    pub active_products: i64,
    pub variants: i64,
    pub images: i64,
    pub collections: i64,
    /// Keyed by plural category name (`sizes`, `colors`, ...).
    pub options: BTreeMap<&'static str, i64>,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any count query fails.
    pub async fn counts(&self) -> Result<DashboardCounts, RepositoryError> {
        let products = ProductRepository::new(self.pool);

        let mut options = BTreeMap::new();
        for category in OptionCategory::ALL {
            let count = OptionRepository::new(self.pool, category).count().await?;
            options.insert(category.plural(), count);
        }

        Ok(DashboardCounts {
            products: products.count(None).await?,
            active_products: products.count(Some(ProductStatus::Active)).await?,
            variants: VariantRepository::new(self.pool).count().await?,
            images: ImageRepository::new(self.pool).count().await?,
            collections: CollectionRepository::new(self.pool).count().await?,
            options,
        })
    }
}
