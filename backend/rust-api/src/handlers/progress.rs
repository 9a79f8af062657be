use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use crate::{
    messages,
    middlewares::auth::JwtClaims,
    models::progress::UpdateProgressRequest,
    models::user::UserRole,
    services::{progress_service::ProgressService, AppState},
};

use crate::extractors::AppJson;

use super::{ensure_role, ApiError};

fn caller_oid(claims: &JwtClaims) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(&claims.sub).map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))
}

/// POST /api/v1/courses/{id}/progress - Mark a lesson complete/incomplete.
/// The upsert is idempotent; the returned percentage is recounted afterwards.
pub async fn update_course_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_oid(&claims)?;

    let progress_service = ProgressService::new(state.mongo.clone());
    let response = progress_service
        .update_progress(user_id, &course_id, req)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(response))
}

/// GET /api/v1/courses/{id}/progress - Read the caller's progress through a
/// course; 404 when the course does not exist
pub async fn get_course_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_oid(&claims)?;

    let progress_service = ProgressService::new(state.mongo.clone());
    let response = progress_service
        .course_progress(user_id, &course_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(response))
}

/// GET /api/v1/progress - Dashboard overview.
/// Parents see their children, instructors the students of their courses.
pub async fn progress_overview(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(&claims, &[UserRole::Parent, UserRole::Instructor])?;

    let caller_id = caller_oid(&claims)?;
    let caller_role = if claims.has_role(UserRole::Parent) {
        UserRole::Parent
    } else {
        UserRole::Instructor
    };

    let progress_service = ProgressService::new(state.mongo.clone());
    let reports = progress_service
        .overview(caller_id, caller_role)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(reports))
}
