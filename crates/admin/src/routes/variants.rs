//! Single-variant endpoints. Listing and creation live under products.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use cobbler_core::VariantId;

use crate::{
    db::VariantRepository,
    error::AppError,
    middleware::{RequireAdminAuth, RequireWriteAccess},
    models::{Variant, VariantInput},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/variants/{id}", get(show).put(update).delete(destroy))
}

pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<Json<Variant>, AppError> {
    VariantRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("variant {id}")))
}

/// Replace a variant's fields. Moving it onto a combination another
/// variant of the same product holds is a 409.
#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn update(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(input): Json<VariantInput>,
) -> Result<Json<Variant>, AppError> {
    let variant = input.validate()?;
    let updated = VariantRepository::new(state.pool())
        .update(id, &variant)
        .await?;
    Ok(Json(updated))
}

#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn destroy(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<StatusCode, AppError> {
    VariantRepository::new(state.pool()).delete(id).await?;
    tracing::info!(variant_id = %id, "Variant deleted");
    Ok(StatusCode::NO_CONTENT)
}
