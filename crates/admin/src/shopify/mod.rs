//! Shopify Admin API client for catalog import.
//!
//! # Security
//!
//! This module holds the Admin API access token. The token is read-only
//! in practice (the catalog sync only queries), but Shopify scopes it to
//! the whole store, so it never leaves this process.
//!
//! # Architecture
//!
//! - Queries implement `graphql_client::GraphQLQuery` and run through one
//!   generic `execute`
//! - Raw response shapes are converted into the domain types in [`types`]
//! - Webhook deliveries are verified with the webhook secret
//!
//! # Example
//!
//! ```rust,ignore
//! use cobbler_admin::shopify::AdminClient;
//!
//! let client = AdminClient::new(&config.shopify)?;
//! let page = client.get_catalog_products(50, None).await?;
//! ```

mod client;
mod conversions;
pub mod queries;
pub mod types;
pub mod webhook;

pub use client::AdminClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
