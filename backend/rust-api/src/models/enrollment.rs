use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::user::bson_datetime_as_chrono;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    InProgress,
    Completed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EnrollmentStatus::InProgress => "in_progress",
            EnrollmentStatus::Completed => "completed",
        }
    }
}

/// Enrollment stored in MongoDB "enrollments" collection.
/// Invariant: at most one enrollment per (userId, courseId) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    #[serde(rename = "courseId")]
    pub course_id: ObjectId,
    #[serde(rename = "exerciseId")]
    pub exercise_id: ObjectId,
    pub status: EnrollmentStatus,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

/// Request to enroll the authenticated user into a course
#[derive(Debug, Deserialize)]
pub struct CreateEnrollmentRequest {
    pub course_id: Option<String>,
    pub exercise_id: Option<String>,
}

/// Enrollment as returned right after creation
#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub exercise_id: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(enrollment: Enrollment) -> Self {
        EnrollmentResponse {
            id: enrollment.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: enrollment.user_id.to_hex(),
            course_id: enrollment.course_id.to_hex(),
            exercise_id: enrollment.exercise_id.to_hex(),
            status: enrollment.status,
            created_at: enrollment.created_at,
        }
    }
}

/// Course summary shown on the "my courses" page
#[derive(Debug, Serialize)]
pub struct EnrolledCourseSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub progress: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_lesson: Option<String>,
    pub completed: bool,
}
