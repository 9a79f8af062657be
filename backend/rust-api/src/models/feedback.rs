use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::{bson_datetime_as_chrono, UserRole};

/// Feedback message from a parent/instructor to another user, tied to a
/// course and optionally a lesson. Stored in "feedback".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "providerId")]
    pub provider_id: ObjectId,
    #[serde(rename = "receiverId")]
    pub receiver_id: ObjectId,
    #[serde(rename = "courseId")]
    pub course_id: ObjectId,
    #[serde(rename = "lessonId", default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<ObjectId>,
    pub content: String,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

/// Request to create feedback
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeedbackRequest {
    #[validate(length(min = 1, message = "نص الملاحظة مطلوب"))]
    pub content: String,

    pub course_id: String,

    pub lesson_id: Option<String>,

    pub receiver_id: String,
}

/// Query params for listing feedback
#[derive(Debug, Deserialize)]
pub struct ListFeedbackQuery {
    pub course_id: Option<String>,
    pub lesson_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackParticipant {
    pub name: String,
    pub role: UserRole,
}

/// Feedback entry enriched with provider/receiver info
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: String,
    pub content: String,
    pub course_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub provider: Option<FeedbackParticipant>,
    pub receiver: Option<FeedbackParticipant>,
}
