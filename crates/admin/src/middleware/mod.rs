//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (recorded on the span and in Sentry)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is not a layer: handlers opt in through the extractors
//! in [`auth`].

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    RequireAdminAuth, RequireSuperAdmin, RequireWriteAccess, clear_current_admin,
    set_current_admin,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, session_store};
