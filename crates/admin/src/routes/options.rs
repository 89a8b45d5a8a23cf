//! Option value CRUD, one route family for all six categories.
//!
//! The `{category}` segment is the plural name: `sizes`, `styles`, `soles`,
//! `materials`, `colors` or `panels`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use cobbler_core::{OptionCategory, Page};

use super::ListParams;
use crate::{
    db::{OptionRepository, options::SORT_COLUMNS},
    error::AppError,
    middleware::{RequireAdminAuth, RequireWriteAccess},
    models::{OptionInput, OptionValue},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/options/{category}", get(list).post(create))
        .route(
            "/api/options/{category}/{id}",
            get(show).put(update).delete(destroy),
        )
}

fn parse_category(segment: &str) -> Result<OptionCategory, AppError> {
    OptionCategory::from_plural(segment)
        .ok_or_else(|| AppError::NotFound(format!("option category {segment:?}")))
}

#[instrument(skip_all, fields(%category))]
pub async fn list(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<OptionValue>>, AppError> {
    let category = parse_category(&category)?;
    let query = params.into_query(SORT_COLUMNS)?;
    let page = OptionRepository::new(state.pool(), category)
        .list(&query)
        .await?;
    Ok(Json(page))
}

#[instrument(skip_all, fields(%category, admin = %admin.email))]
pub async fn create(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(input): Json<OptionInput>,
) -> Result<(StatusCode, Json<OptionValue>), AppError> {
    let category = parse_category(&category)?;
    let option = input.validate(category)?;
    let created = OptionRepository::new(state.pool(), category)
        .create(&option)
        .await?;
    tracing::info!(%category, id = created.id, name = %created.name, "Option created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path((category, id)): Path<(String, i32)>,
) -> Result<Json<OptionValue>, AppError> {
    let category = parse_category(&category)?;
    OptionRepository::new(state.pool(), category)
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{category} {id}")))
}

#[instrument(skip_all, fields(%category, admin = %admin.email))]
pub async fn update(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path((category, id)): Path<(String, i32)>,
    Json(input): Json<OptionInput>,
) -> Result<Json<OptionValue>, AppError> {
    let category = parse_category(&category)?;
    let option = input.validate(category)?;
    let updated = OptionRepository::new(state.pool(), category)
        .update(id, &option)
        .await?;
    Ok(Json(updated))
}

/// Delete a value. Values still used by a variant answer 409.
#[instrument(skip_all, fields(%category, id, admin = %admin.email))]
pub async fn destroy(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
    Path((category, id)): Path<(String, i32)>,
) -> Result<StatusCode, AppError> {
    let category = parse_category(&category)?;
    OptionRepository::new(state.pool(), category)
        .delete(id)
        .await?;
    tracing::info!(%category, id, "Option deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("colors").ok(), Some(OptionCategory::Color));
        assert_eq!(parse_category("panels").ok(), Some(OptionCategory::Panel));
        assert!(matches!(parse_category("laces"), Err(AppError::NotFound(_))));
    }
}
