//! Password login, logout and token issuing.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    error::{AppError, clear_sentry_user, set_sentry_user},
    middleware::{RequireAdminAuth, clear_current_admin, set_current_admin},
    models::CurrentAdmin,
    services::{AdminAuthError, AdminAuthService},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/token", post(token))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login and token responses.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub admin: CurrentAdmin,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Check credentials, start a session and hand back a bearer token.
#[instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = match AdminAuthService::new(state.pool())
        .authenticate(&body.email, &body.password)
        .await
    {
        Ok(user) => user,
        Err(AdminAuthError::InvalidCredentials) => {
            tracing::info!("Admin login rejected");
            return Err(AdminAuthError::InvalidCredentials.into());
        }
        Err(e) => return Err(e.into()),
    };

    let admin = CurrentAdmin::from(&user);
    set_current_admin(&session, &admin)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    let issued = state.jwt().issue(&admin).map_err(AdminAuthError::from)?;

    set_sentry_user(admin.id.as_i32(), Some(admin.email.as_str()));
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok(Json(TokenResponse {
        admin,
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_admin(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<CurrentAdmin> {
    Json(admin)
}

/// Issue a fresh JWT, e.g. before the current one expires.
pub async fn token(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, AppError> {
    let issued = state.jwt().issue(&admin).map_err(AdminAuthError::from)?;
    Ok(Json(TokenResponse {
        admin,
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}
