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
    models::feedback::{CreateFeedbackRequest, ListFeedbackQuery},
    models::user::UserRole,
    services::{feedback_service::FeedbackService, AppState},
};

use super::{ensure_role, validation_error, ApiError};

/// POST /api/v1/feedback - Leave feedback (parent/instructor only)
pub async fn create_feedback(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(&claims, &[UserRole::Parent, UserRole::Instructor])?;

    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    let provider_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let feedback_service = FeedbackService::new(state.mongo.clone());
    let feedback = feedback_service
        .create_feedback(provider_id, req)
        .await
        .map_err(ApiError::from_service)?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// GET /api/v1/feedback - Feedback where the caller is provider or receiver
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<ListFeedbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let caller_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let feedback_service = FeedbackService::new(state.mongo.clone());
    let feedback = feedback_service
        .list_feedback(caller_id, query)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(feedback))
}
