//! Dashboard summary.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use crate::{
    db::{DashboardCounts, DashboardRepository, SyncRunRepository},
    error::AppError,
    middleware::RequireAdminAuth,
    models::SyncRun,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(index))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub counts: DashboardCounts,
    pub last_sync: Option<SyncRun>,
    pub sync_running: bool,
}

#[instrument(skip_all)]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let counts = DashboardRepository::new(state.pool()).counts().await?;
    let last_sync = SyncRunRepository::new(state.pool()).latest().await?;

    Ok(Json(DashboardResponse {
        counts,
        last_sync,
        sync_running: state.sync().is_running(),
    }))
}
