//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use cobbler_core::{ComboParseError, IndexError};

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::auth::JwtError;
use crate::services::{AdminAuthError, SyncError, UploadError};
use crate::shopify::AdminShopifyError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Login, password or token handling failed.
    #[error("{0}")]
    Auth(#[from] AdminAuthError),

    /// Image upload failed or was rejected.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The write collides with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A feature is disabled by configuration.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_owned()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ComboParseError> for AppError {
    fn from(err: ComboParseError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::AlreadyRunning => Self::Conflict(SyncError::AlreadyRunning.to_string()),
            SyncError::Shopify(e) => Self::Shopify(e),
            SyncError::Repository(e) => e.into(),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(e) => auth_status(e),
            Self::Upload(e) => upload_status(e),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Shopify(_) => "External service error".to_owned(),
            Self::Upload(
                UploadError::Http(_) | UploadError::Api { .. } | UploadError::Parse(_),
            ) => "Image host error".to_owned(),
            Self::Auth(
                AdminAuthError::Hash(_)
                | AdminAuthError::Repository(_)
                | AdminAuthError::Jwt(JwtError::GenerationFailed(_)),
            ) => "Internal server error".to_owned(),
            Self::Auth(AdminAuthError::Jwt(_)) => "invalid or expired token".to_owned(),
            _ => self.to_string(),
        }
    }
}

const fn auth_status(err: &AdminAuthError) -> StatusCode {
    match err {
        AdminAuthError::InvalidEmail(_) | AdminAuthError::WeakPassword(_) => {
            StatusCode::BAD_REQUEST
        }
        AdminAuthError::InvalidCredentials
        | AdminAuthError::Jwt(
            JwtError::InvalidToken(_) | JwtError::ExpiredToken | JwtError::InvalidSignature,
        ) => StatusCode::UNAUTHORIZED,
        AdminAuthError::UserNotFound => StatusCode::NOT_FOUND,
        AdminAuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AdminAuthError::Hash(_)
        | AdminAuthError::Jwt(JwtError::GenerationFailed(_))
        | AdminAuthError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn upload_status(err: &UploadError) -> StatusCode {
    match err {
        UploadError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        UploadError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Empty => StatusCode::BAD_REQUEST,
        UploadError::Http(_) | UploadError::Api { .. } | UploadError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server and upstream errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Set the Sentry user context from an admin user ID.
pub fn set_sentry_user(admin_user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = AppError::Conflict("name already exists".to_string());
        assert_eq!(err.to_string(), "Conflict: name already exists");
    }

    #[test]
    fn test_repository_errors_map_to_status() {
        assert_eq!(
            AppError::from(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(RepositoryError::Conflict("in use".to_owned())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(RepositoryError::DataCorruption("bad handle".to_owned())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_and_upload_status() {
        assert_eq!(
            AppError::from(AdminAuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AdminAuthError::WeakPassword(12)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AdminAuthError::Jwt(JwtError::ExpiredToken)).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(UploadError::TooLarge { size: 11, max: 10 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::from(UploadError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_sync_already_running_is_conflict() {
        assert_eq!(
            AppError::from(SyncError::AlreadyRunning).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_response_body_is_json() {
        let (status, body) = body_json(AppError::BadRequest("unknown sort column".to_owned())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad request: unknown sort column");
    }

    #[tokio::test]
    async fn test_internal_details_not_exposed() {
        let (status, body) = body_json(AppError::Internal("pool timed out".to_owned())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");

        let (_, body) = body_json(AppError::from(AdminAuthError::Jwt(
            JwtError::InvalidToken("bad base64".to_owned()),
        )))
        .await;
        assert_eq!(body["error"], "invalid or expired token");
    }
}
