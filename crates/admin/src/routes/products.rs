//! Product CRUD, SEO, per-product variants and the resolve preview.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cobbler_core::{
    Combination, Handle, OptionCategory, Page, ProductId, ProductStatus, Resolution, VariantId,
    VariantIndex,
};

use super::{ListParams, images::destroy_assets};
use crate::{
    db::{
        ImageRepository, ProductRepository, SeoRepository, VariantRepository,
        products::SORT_COLUMNS,
    },
    error::AppError,
    middleware::{RequireAdminAuth, RequireWriteAccess},
    models::{Product, ProductDetail, ProductInput, ProductSeo, Variant, VariantInput},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/{id}", get(show).put(update).delete(destroy))
        .route("/api/products/by-handle/{handle}", get(show_by_handle))
        .route("/api/products/{id}/seo", put(update_seo))
        .route(
            "/api/products/{id}/variants",
            get(list_variants).post(create_variant),
        )
        .route("/api/products/{id}/resolve", post(resolve))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

impl StatusFilter {
    fn parse(&self) -> Result<Option<ProductStatus>, AppError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(AppError::BadRequest))
            .transpose()
    }
}

#[instrument(skip_all)]
pub async fn list(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Page<Product>>, AppError> {
    let status = filter.parse()?;
    let query = params.into_query(SORT_COLUMNS)?;
    let page = ProductRepository::new(state.pool())
        .list(&query, status)
        .await?;
    Ok(Json(page))
}

#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn create(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = input.validate()?;
    let created = ProductRepository::new(state.pool()).create(&product).await?;
    tracing::info!(product_id = %created.id, handle = %created.handle, "Product created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Product with SEO, images and variants.
pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>, AppError> {
    let product = require_product(&state, id).await?;
    Ok(Json(product_detail(&state, product).await?))
}

/// Same as [`show`], looked up by the storefront handle.
pub async fn show_by_handle(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<ProductDetail>, AppError> {
    let handle = Handle::parse(handle.trim()).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let product = ProductRepository::new(state.pool())
        .get_by_handle(&handle)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {handle}")))?;
    Ok(Json(product_detail(&state, product).await?))
}

async fn product_detail(state: &AppState, product: Product) -> Result<ProductDetail, AppError> {
    let pool = state.pool();
    let id = product.id;
    let seo_repo = SeoRepository::new(pool);
    let image_repo = ImageRepository::new(pool);
    let variant_repo = VariantRepository::new(pool);
    let (seo, images, variants) = tokio::try_join!(
        seo_repo.get(id),
        image_repo.list_for_product(id),
        variant_repo.list_for_product(id),
    )?;

    Ok(ProductDetail {
        product,
        seo,
        images,
        variants,
    })
}

#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn update(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, AppError> {
    let product = input.validate()?;
    let updated = ProductRepository::new(state.pool())
        .update(id, &product)
        .await?;
    Ok(Json(updated))
}

/// Delete a product with its variants and images. Uploaded images are
/// also removed from the asset host.
#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn destroy(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    let assets = ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, assets = assets.len(), "Product deleted");
    destroy_assets(state.uploader(), &assets).await;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn update_seo(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductSeo>,
) -> Result<Json<ProductSeo>, AppError> {
    let seo = input.validate()?;
    Ok(Json(SeoRepository::new(state.pool()).upsert(id, &seo).await?))
}

pub async fn list_variants(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<Variant>>, AppError> {
    require_product(&state, id).await?;
    Ok(Json(
        VariantRepository::new(state.pool())
            .list_for_product(id)
            .await?,
    ))
}

/// Add a local variant. A combination the product already has is a 409.
#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn create_variant(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(input): Json<VariantInput>,
) -> Result<(StatusCode, Json<Variant>), AppError> {
    let variant = input.validate()?;
    require_product(&state, id).await?;
    let created = VariantRepository::new(state.pool())
        .create(id, &variant)
        .await?;
    tracing::info!(variant_id = %created.id, options = %created.options, "Variant created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Outcome of resolving a combination against a product's variants.
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub state: &'static str,
    pub variant_id: Option<VariantId>,
    pub missing: Vec<OptionCategory>,
    pub variant: Option<Variant>,
}

impl From<&Resolution> for ResolveResponse {
    fn from(resolution: &Resolution) -> Self {
        Self {
            state: resolution.state(),
            variant_id: resolution.variant_id(),
            missing: match resolution {
                Resolution::Incomplete { missing } => missing.clone(),
                _ => Vec::new(),
            },
            variant: None,
        }
    }
}

/// Preview what a customer selection resolves to.
///
/// The body is a map of category to option ID, e.g.
/// `{"size": 3, "color": 7}`. It is read like the storefront query string:
/// unknown keys are ignored and IDs may be numeric strings.
pub async fn resolve(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(combination): Json<Combination>,
) -> Result<Json<ResolveResponse>, AppError> {
    require_product(&state, id).await?;
    let variants = VariantRepository::new(state.pool());
    let index = VariantIndex::build(variants.keys_for_product(id).await?)?;

    let resolution = index.resolve(&combination);
    let mut response = ResolveResponse::from(&resolution);
    if let Some(variant_id) = resolution.variant_id() {
        response.variant = variants.get(variant_id).await?;
    }
    Ok(Json(response))
}

async fn require_product(state: &AppState, id: ProductId) -> Result<Product, AppError> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        let filter = |s: Option<&str>| StatusFilter {
            status: s.map(str::to_owned),
        };
        assert_eq!(filter(None).parse().unwrap(), None);
        assert_eq!(filter(Some("")).parse().unwrap(), None);
        assert_eq!(
            filter(Some("ACTIVE")).parse().unwrap(),
            Some(ProductStatus::Active)
        );
        assert!(matches!(
            filter(Some("deleted")).parse(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_resolve_response_shapes() {
        let available = ResolveResponse::from(&Resolution::Available(VariantId::new(9)));
        assert_eq!(available.state, "available");
        assert_eq!(available.variant_id, Some(VariantId::new(9)));
        assert!(available.missing.is_empty());

        let incomplete = ResolveResponse::from(&Resolution::Incomplete {
            missing: vec![OptionCategory::Sole, OptionCategory::Panel],
        });
        assert_eq!(incomplete.state, "incomplete");
        assert_eq!(
            incomplete.missing,
            vec![OptionCategory::Sole, OptionCategory::Panel]
        );
    }
}
