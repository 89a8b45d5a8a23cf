//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Password login, argon2 hashing and JWT issuing
//! - `sync` - Shopify catalog synchronization
//! - `uploads` - Signed image uploads to Cloudinary

pub mod auth;
pub mod sync;
pub mod uploads;

pub use auth::{AdminAuthError, AdminAuthService, JwtService};
pub use sync::{CatalogSync, ProductTally, SyncError, SyncTrigger};
pub use uploads::{AssetUploader, ImageFile, UploadError, UploadedAsset};
