use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::user::{ListUsersQuery, UpdateUserRoleRequest, UserProfile},
    services::{
        audit_service::AuditService, user_management_service::UserManagementService, AppState,
    },
};

use crate::handlers::{validation_error, ApiError};

/// GET /api/v1/users - List users (admin only; the router enforces the guard)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let user_service = UserManagementService::new(state.mongo.clone());

    let users = user_service
        .list_users(query)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(users))
}

/// GET /api/v1/users/{id} - Get a user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let user_service = UserManagementService::new(state.mongo.clone());

    let user = user_service
        .get_user(&user_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(user))
}

/// PATCH /api/v1/users/{id} - Change a user's role.
/// Demoting the sole remaining admin is refused.
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<UpdateUserRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    tracing::info!(
        "Admin {} changing role of {} to {}",
        claims.sub,
        user_id,
        req.role.as_str()
    );

    let user_service = UserManagementService::new(state.mongo.clone());
    let updated_user = user_service
        .change_role(&user_id, req.role)
        .await
        .map_err(ApiError::from_service)?;

    let audit_service = AuditService::new(state.mongo.clone());
    let _ = audit_service
        .log_role_change(&claims.sub, &user_id, req.role.as_str())
        .await;

    Ok(Json(updated_user))
}

/// DELETE /api/v1/users/{id} - Delete a user.
/// Deleting the sole remaining admin is refused.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Admin {} deleting user {}", claims.sub, user_id);

    let user_service = UserManagementService::new(state.mongo.clone());
    let deleted_user = user_service
        .delete_user(&user_id)
        .await
        .map_err(ApiError::from_service)?;

    let audit_service = AuditService::new(state.mongo.clone());
    let _ = audit_service
        .log_user_delete(&claims.sub, &user_id, &deleted_user.email)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
