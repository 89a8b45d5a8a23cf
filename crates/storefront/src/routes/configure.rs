//! JSON configurator API.
//!
//! Same resolution as the HTML page, for pages that update in place.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::products::selection;
use crate::error::Result;
use crate::services::ConfiguratorView;
use crate::state::AppState;

/// `GET /api/products/{handle}/configure?material=1&color=4…`
pub async fn configure(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ConfiguratorView>> {
    let combo = selection(&pairs)?;
    let view = state.configurator().configure(&handle, &combo).await?;
    Ok(Json(view))
}
