//! Synced collections (read-only; Shopify owns them).

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use cobbler_core::Page;

use super::ListParams;
use crate::{
    db::{CollectionRepository, collections::SORT_COLUMNS},
    error::AppError,
    middleware::RequireAdminAuth,
    models::Collection,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/collections", get(list))
}

pub async fn list(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Collection>>, AppError> {
    let query = params.into_query(SORT_COLUMNS)?;
    Ok(Json(CollectionRepository::new(state.pool()).list(&query).await?))
}
