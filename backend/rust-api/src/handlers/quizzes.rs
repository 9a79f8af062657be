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
    models::quiz::{CreateQuizAttemptRequest, CreateQuizRequest, ListQuizAttemptsQuery},
    models::user::UserRole,
    services::{quiz_service::QuizService, AppState},
};

use super::{ensure_role, validation_error, ApiError};

/// GET /api/v1/quizzes - List quizzes with embedded questions
pub async fn list_quizzes(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let quiz_service = QuizService::new(state.mongo.clone());
    let quizzes = quiz_service
        .list_quizzes()
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(quizzes))
}

/// POST /api/v1/quizzes - Create a quiz (instructor/admin)
pub async fn create_quiz(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(&claims, &[UserRole::Instructor, UserRole::Admin])?;

    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    let quiz_service = QuizService::new(state.mongo.clone());
    let quiz = quiz_service
        .create_quiz(req)
        .await
        .map_err(ApiError::from_service)?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// POST /api/v1/quiz-attempts - Record a quiz attempt (append-only)
pub async fn create_quiz_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateQuizAttemptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let quiz_service = QuizService::new(state.mongo.clone());
    let attempt = quiz_service
        .submit_attempt(user_id, req)
        .await
        .map_err(ApiError::from_service)?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// GET /api/v1/quiz-attempts?quiz_id= - The caller's attempts, newest first
pub async fn list_quiz_attempts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<ListQuizAttemptsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(quiz_id) = query.quiz_id else {
        return Err(ApiError::bad_request(messages::MISSING_FIELDS));
    };

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let quiz_service = QuizService::new(state.mongo.clone());
    let attempts = quiz_service
        .list_attempts(user_id, &quiz_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(attempts))
}
