//! Admin user management, super admins only.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use serde::Deserialize;
use tracing::instrument;

use cobbler_core::{AdminRole, AdminUserId};

use crate::{
    db::AdminUserRepository,
    error::AppError,
    middleware::RequireSuperAdmin,
    models::AdminUser,
    services::AdminAuthService,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin-users", get(list).post(create))
        .route("/api/admin-users/{id}/role", put(update_role))
        .route("/api/admin-users/{id}", delete(destroy))
}

#[derive(Deserialize)]
pub struct CreateAdminRequest {
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: AdminRole,
}

pub async fn list(
    RequireSuperAdmin(_admin): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUser>>, AppError> {
    Ok(Json(AdminUserRepository::new(state.pool()).list_all().await?))
}

#[instrument(skip_all, fields(admin = %admin.email, new_email = %body.email))]
pub async fn create(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminUser>), AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_owned()));
    }
    let user = AdminAuthService::new(state.pool())
        .create_admin(&body.email, name, body.role, &body.password)
        .await?;
    tracing::info!(admin_id = %user.id, role = %user.role, "Admin user created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Change another admin's role. Super admins cannot demote themselves.
#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn update_role(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<AdminUser>, AppError> {
    if id == admin.id && body.role != AdminRole::SuperAdmin {
        return Err(AppError::BadRequest(
            "you cannot change your own role".to_owned(),
        ));
    }
    let user = AdminUserRepository::new(state.pool())
        .update_role(id, body.role)
        .await?;
    tracing::info!(admin_id = %user.id, role = %user.role, "Admin role changed");
    Ok(Json(user))
}

#[instrument(skip_all, fields(%id, admin = %admin.email))]
pub async fn destroy(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminUserId>,
) -> Result<StatusCode, AppError> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "you cannot delete your own account".to_owned(),
        ));
    }
    AdminUserRepository::new(state.pool()).delete(id).await?;
    tracing::info!(admin_id = %id, "Admin user deleted");
    Ok(StatusCode::NO_CONTENT)
}
