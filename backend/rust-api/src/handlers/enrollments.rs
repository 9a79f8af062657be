use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    messages,
    middlewares::auth::JwtClaims,
    models::enrollment::CreateEnrollmentRequest,
    services::{enrollment_service::EnrollmentService, AppState},
};

use super::ApiError;

/// GET /api/v1/enrollments - The caller's enrolled courses with progress
pub async fn list_enrollments(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let enrollment_service = EnrollmentService::new(state.mongo.clone());
    let courses = enrollment_service
        .list_enrolled_courses(user_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(courses))
}

/// POST /api/v1/enrollments - Enroll the caller into a course.
/// A second enrollment into the same course is rejected.
pub async fn create_enrollment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(course_id), Some(exercise_id)) = (req.course_id, req.exercise_id) else {
        return Err(ApiError::bad_request(messages::ENROLLMENT_IDS_REQUIRED));
    };

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;
    let course_oid = ObjectId::parse_str(&course_id)
        .map_err(|_| ApiError::bad_request(messages::ENROLLMENT_IDS_REQUIRED))?;
    let exercise_oid = ObjectId::parse_str(&exercise_id)
        .map_err(|_| ApiError::bad_request(messages::ENROLLMENT_IDS_REQUIRED))?;

    let enrollment_service = EnrollmentService::new(state.mongo.clone());
    let enrollment = enrollment_service
        .enroll(user_id, course_oid, exercise_oid)
        .await
        .map_err(ApiError::from_service)?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}
