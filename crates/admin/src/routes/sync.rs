//! Sync triggers and history.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    db::SyncRunRepository,
    error::AppError,
    middleware::{RequireAdminAuth, RequireWriteAccess},
    models::SyncRun,
    services::SyncTrigger,
    shopify::webhook::{HMAC_HEADER, TOPIC_HEADER, is_catalog_topic, verify_webhook},
    state::AppState,
};

const DEFAULT_RUNS: i64 = 20;
const MAX_RUNS: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sync", post(trigger))
        .route("/api/sync/runs", get(runs))
        .route("/webhooks/shopify", post(webhook))
}

#[derive(Debug, Serialize)]
pub struct SyncAccepted {
    pub status: &'static str,
    pub triggered_by: String,
}

/// Start a sync in the background. 409 if one is already running.
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn trigger(
    RequireWriteAccess(admin): RequireWriteAccess,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SyncAccepted>), AppError> {
    let trigger = SyncTrigger::Manual {
        email: admin.email.to_string(),
    };
    let triggered_by = trigger.to_string();
    state.sync().try_spawn(trigger)?;
    tracing::info!(%triggered_by, "Catalog sync started");

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAccepted {
            status: "started",
            triggered_by,
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsParams {
    pub limit: Option<i64>,
}

pub async fn runs(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<RunsParams>,
) -> Result<Json<Vec<SyncRun>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_RUNS).clamp(1, MAX_RUNS);
    Ok(Json(
        SyncRunRepository::new(state.pool()).list_recent(limit).await?,
    ))
}

/// Shopify webhook receiver.
///
/// The body must be signed with the configured webhook secret. Catalog
/// topics start a background sync, or queue one more run after the sync
/// in progress, and answer 200 either way. Other topics are acknowledged
/// and ignored.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let secret = state
        .config()
        .shopify
        .webhook_secret
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("webhooks are not configured".to_owned()))?;

    let signature = header_str(&headers, HMAC_HEADER)
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_owned()))?;
    if !verify_webhook(secret.expose_secret().as_bytes(), &body, signature) {
        tracing::warn!("Rejected webhook with bad signature");
        return Err(AppError::Unauthorized("invalid webhook signature".to_owned()));
    }

    let topic = header_str(&headers, TOPIC_HEADER).unwrap_or_default();
    if !is_catalog_topic(topic) {
        tracing::debug!(topic, "Ignoring webhook topic");
        return Ok(StatusCode::OK);
    }

    let started = state.sync().request(SyncTrigger::Webhook {
        topic: topic.to_owned(),
    });
    if started {
        tracing::info!(topic, "Webhook started catalog sync");
    } else {
        tracing::info!(topic, "Webhook queued a follow-up catalog sync");
    }
    Ok(StatusCode::OK)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_header_str_trims_and_skips_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(TOPIC_HEADER, HeaderValue::from_static(" products/update "));
        headers.insert(HMAC_HEADER, HeaderValue::from_static("   "));

        assert_eq!(header_str(&headers, TOPIC_HEADER), Some("products/update"));
        assert_eq!(header_str(&headers, HMAC_HEADER), None);
        assert_eq!(header_str(&headers, "x-missing"), None);
    }
}
