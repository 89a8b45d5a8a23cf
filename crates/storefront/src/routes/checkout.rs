//! Checkout hand-off to Shopify.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use cobbler_core::VariantId;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::{MAX_CHECKOUT_QUANTITY, checkout_url};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub quantity: Option<u32>,
}

/// Validate a requested quantity, defaulting to one.
///
/// # Errors
///
/// Returns `AppError::BadRequest` outside `1..=MAX_CHECKOUT_QUANTITY`.
pub fn checkout_quantity(requested: Option<u32>) -> Result<u32> {
    let quantity = requested.unwrap_or(1);
    if (1..=MAX_CHECKOUT_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(AppError::BadRequest(format!(
            "quantity must be between 1 and {MAX_CHECKOUT_QUANTITY}"
        )))
    }
}

/// `GET /checkout/{variant_id}?quantity=` redirects (303) to the Shopify
/// cart permalink.
#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(variant_id): Path<i32>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Redirect> {
    let quantity = checkout_quantity(query.quantity)?;
    let id = VariantId::new(variant_id);

    let variant = CatalogRepository::new(state.pool())
        .checkout_variant(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("variant {id}")))?;

    // Unsynced variants have nothing to check out in Shopify yet.
    let url = variant
        .shopify_id
        .as_deref()
        .and_then(|gid| checkout_url(state.configurator().store(), gid, quantity))
        .ok_or_else(|| AppError::NotFound(format!("variant {id} is not available online")))?;

    let variant_label = id.to_string();
    add_breadcrumb(
        "checkout",
        "Redirected to Shopify cart",
        Some(&[("variant_id", variant_label.as_str())]),
    );
    tracing::info!(variant_id = %id, quantity, "Checkout redirect");

    Ok(Redirect::to(&url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_quantity_bounds() {
        assert_eq!(checkout_quantity(None).ok(), Some(1));
        assert_eq!(checkout_quantity(Some(1)).ok(), Some(1));
        assert_eq!(checkout_quantity(Some(10)).ok(), Some(10));
        assert!(matches!(
            checkout_quantity(Some(0)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            checkout_quantity(Some(11)),
            Err(AppError::BadRequest(_))
        ));
    }
}
