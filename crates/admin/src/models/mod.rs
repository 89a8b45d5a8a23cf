//! Domain models for admin.

pub mod admin_user;
pub mod catalog;
pub mod session;
pub mod sync_run;

pub use admin_user::{AdminRole, AdminUser};
pub use catalog::{
    Collection, NewImage, NewOption, NewProduct, NewVariant, OptionInput, OptionValue, Product,
    ProductDetail, ProductImage, ProductInput, ProductSeo, ValidationError, Variant, VariantInput,
};
pub use session::{CurrentAdmin, keys as session_keys};
pub use sync_run::{SyncReport, SyncRun};
