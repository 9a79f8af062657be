use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    messages,
    middlewares::auth::JwtClaims,
    models::exercise::{CreateExerciseRequest, ListExercisesQuery, SubmitAttemptRequest},
    models::user::UserRole,
    services::{exercise_service::ExerciseService, AppState},
};

use super::{ensure_role, validation_error, ApiError};

/// GET /api/v1/exercises - List exercises (optionally by type/lesson)
pub async fn list_exercises(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListExercisesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let exercise_service = ExerciseService::new(state.mongo.clone());
    let exercises = exercise_service
        .list_exercises(query)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(exercises))
}

/// POST /api/v1/exercises - Create an exercise (instructor/admin)
pub async fn create_exercise(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateExerciseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(&claims, &[UserRole::Instructor, UserRole::Admin])?;

    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    let exercise_service = ExerciseService::new(state.mongo.clone());
    let exercise = exercise_service
        .create_exercise(req)
        .await
        .map_err(ApiError::from_service)?;

    Ok((StatusCode::CREATED, Json(exercise)))
}

/// PUT /api/v1/exercises - Submit an exercise attempt; completing an
/// exercise marks its lesson complete for the caller's enrollment
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let exercise_service = ExerciseService::new(state.mongo.clone());
    let attempt = exercise_service
        .submit_attempt(user_id, req)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(attempt))
}
