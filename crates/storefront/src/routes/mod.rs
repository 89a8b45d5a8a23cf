//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database)
//! GET  /                                - Redirect to /products
//!
//! # Products
//! GET  /products                        - Product listing (paginated)
//! GET  /products/{handle}               - Configurator, selection in the query string
//!
//! # API (rate limited)
//! GET  /api/products/{handle}/configure - Configurator state as JSON
//!
//! # Checkout (rate limited)
//! GET  /checkout/{variant_id}           - 303 to the Shopify cart permalink
//! ```

pub mod checkout;
pub mod configure;
pub mod health;
pub mod products;

use axum::{Router, response::Redirect, routing::get};

use crate::middleware::{api_rate_limiter, checkout_rate_limiter};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// JSON API, behind its own rate limiter.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products/{handle}/configure", get(configure::configure))
        .layer(api_rate_limiter())
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/{variant_id}", get(checkout::checkout))
        .layer(checkout_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/", get(|| async { Redirect::to("/products") }))
        .nest("/products", product_routes())
        .nest("/api", api_routes())
        .nest("/checkout", checkout_routes())
}
