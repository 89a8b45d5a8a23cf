//! Product image uploads.
//!
//! Uploads go to the asset host first; the row is only written once the
//! host has accepted the file.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use tracing::instrument;

use cobbler_core::{ImageId, ProductId, VariantId};

use crate::{
    db::{ImageRepository, ProductRepository, VariantRepository},
    error::AppError,
    middleware::{RequireAdminAuth, RequireWriteAccess},
    models::{NewImage, ProductImage},
    services::{AssetUploader, ImageFile, UploadError, uploads::PRODUCT_FOLDER},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products/{id}/images", get(list).post(upload))
        .route("/api/images/{id}", delete(destroy))
}

pub async fn list(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<ProductImage>>, AppError> {
    Ok(Json(
        ImageRepository::new(state.pool())
            .list_for_product(id)
            .await?,
    ))
}

/// Fields accepted by the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<ImageFile>,
    alt_text: Option<String>,
    variant_id: Option<VariantId>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("multipart error: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("read error: {e}")))?;
                form.file = Some(ImageFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "alt_text" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("read error: {e}")))?;
                let text = text.trim();
                form.alt_text = (!text.is_empty()).then(|| text.to_owned());
            }
            "variant_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("read error: {e}")))?;
                let id = text
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| AppError::BadRequest(format!("invalid variant_id {text:?}")))?;
                form.variant_id = Some(VariantId::new(id));
            }
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

/// Upload an image and attach it to a product, optionally pinned to one
/// of its variants.
#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn upload(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductImage>), AppError> {
    let uploader = state.uploader().ok_or(UploadError::NotConfigured)?;
    let form = read_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("missing file field".to_owned()))?;
    file.validate(uploader.max_bytes())?;

    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    if let Some(variant_id) = form.variant_id {
        let variant = VariantRepository::new(state.pool()).get(variant_id).await?;
        if variant.is_none_or(|v| v.product_id != id) {
            return Err(AppError::BadRequest(format!(
                "variant {variant_id} does not belong to product {id}"
            )));
        }
    }

    let asset = uploader.upload(file, PRODUCT_FOLDER).await?;
    let image = NewImage {
        product_id: id,
        variant_id: form.variant_id,
        asset_public_id: asset.public_id,
        url: asset.secure_url,
        alt_text: form.alt_text,
        width: asset.width,
        height: asset.height,
    };

    match ImageRepository::new(state.pool()).create(&image).await {
        Ok(created) => {
            tracing::info!(image_id = %created.id, "Image uploaded");
            Ok((StatusCode::CREATED, Json(created)))
        }
        Err(e) => {
            destroy_assets(Some(uploader), std::slice::from_ref(&image.asset_public_id)).await;
            Err(e.into())
        }
    }
}

#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn destroy(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<ImageId>,
) -> Result<StatusCode, AppError> {
    let images = ImageRepository::new(state.pool());
    let image = images
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("image {id}")))?;
    let removed = images.delete(image.product_id, id).await?;

    if let Some(public_id) = removed.asset_public_id {
        destroy_assets(state.uploader(), &[public_id]).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Remove hosted assets whose rows are already gone.
///
/// Failures are logged, not returned.
pub(crate) async fn destroy_assets(uploader: Option<&AssetUploader>, public_ids: &[String]) {
    if public_ids.is_empty() {
        return;
    }
    let Some(uploader) = uploader else {
        tracing::warn!(
            count = public_ids.len(),
            "Uploads not configured, leaving hosted assets in place"
        );
        return;
    };

    for public_id in public_ids {
        if let Err(e) = uploader.destroy(public_id).await {
            tracing::warn!(%public_id, error = %e, "Failed to destroy hosted asset");
        }
    }
}
