//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{AssetUploader, CatalogSync, JwtService, UploadError};
use crate::shopify::{AdminClient, AdminShopifyError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("shopify client: {0}")]
    Shopify(#[from] AdminShopifyError),
    #[error("upload client: {0}")]
    Upload(#[from] UploadError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the pool, configuration and the long-lived service handles.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    jwt: JwtService,
    uploader: Option<AssetUploader>,
    sync: Arc<CatalogSync>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Uploads are enabled only when Cloudinary credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an outbound HTTP client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let client = AdminClient::new(&config.shopify)?;
        let jwt = JwtService::new(&config.jwt);
        let uploader = config
            .cloudinary
            .as_ref()
            .map(|c| AssetUploader::new(c, config.upload_max_bytes))
            .transpose()?;
        let sync = Arc::new(CatalogSync::new(pool.clone(), client));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                uploader,
                sync,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.inner.jwt
    }

    /// The image uploader, if uploads are configured.
    #[must_use]
    pub fn uploader(&self) -> Option<&AssetUploader> {
        self.inner.uploader.as_ref()
    }

    #[must_use]
    pub fn sync(&self) -> &Arc<CatalogSync> {
        &self.inner.sync
    }
}
