//! Cobbler Core - Shared catalog types library.
//!
//! This crate provides common types used across all Cobbler components:
//! - `storefront` - Public product configurator
//! - `admin` - Catalog administration API and Shopify sync
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, handles and statuses
//! - [`options`] - The six option categories a shoe is configured along
//! - [`configurator`] - Combinations and exact-match variant resolution
//! - [`pagination`] - Page requests and paged results for list endpoints
//! - [`gid`] - Shopify global ID parsing

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod configurator;
pub mod gid;
pub mod options;
pub mod pagination;
pub mod types;

pub use configurator::{Combination, ComboParseError, IndexError, OptionKey, Resolution, VariantIndex};
pub use gid::numeric_id;
pub use options::OptionCategory;
pub use pagination::{Page, PageRequest, SortDirection};
pub use types::*;
