//! Storefront services.
//!
//! - [`configurator`] - Per-product option selection and variant resolution

pub mod configurator;

pub use configurator::{
    CategoryView, ConfiguratorError, ConfiguratorView, Configurator, ImageView,
    MAX_CHECKOUT_QUANTITY, OptionChoice, ProductConfiguration, VariantView, checkout_url,
};
