use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::user::bson_datetime_as_chrono;

/// Per-user lesson completion record in "user_progress".
///
/// `_id` is the composite string `"{userId}_{lessonId}"` so that marking a
/// lesson complete twice upserts the same document instead of creating a
/// second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    #[serde(rename = "courseId")]
    pub course_id: ObjectId,
    #[serde(rename = "lessonId")]
    pub lesson_id: ObjectId,
    pub completed: bool,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub attempts: i32,
}

impl UserProgress {
    /// Composite key used as the `_id` of a user-lesson progress document
    pub fn composite_id(user_id: &ObjectId, lesson_id: &ObjectId) -> String {
        format!("{}_{}", user_id.to_hex(), lesson_id.to_hex())
    }
}

/// Per-enrollment lesson progress in "lesson_progress", upserted when an
/// exercise attempt completes a lesson. Keyed by (enrollmentId, lessonId).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonProgress {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "enrollmentId")]
    pub enrollment_id: ObjectId,
    #[serde(rename = "lessonId")]
    pub lesson_id: ObjectId,
    pub completed: bool,
    #[serde(default)]
    pub score: i32,
    #[serde(rename = "timeSpent", default)]
    pub time_spent: i32,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

/// Request to mark a lesson complete/incomplete
#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub lesson_id: String,
    pub completed: bool,
}

/// Response after a progress update
#[derive(Debug, Serialize)]
pub struct UpdateProgressResponse {
    pub success: bool,
    pub progress: i32,
    pub completed_lessons: u64,
}

#[derive(Debug, Serialize)]
pub struct LessonWithCompletion {
    pub id: String,
    pub title: String,
    pub duration: i32,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct CourseProgressInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub lessons: Vec<LessonWithCompletion>,
}

/// Response for GET /courses/{id}/progress
#[derive(Debug, Serialize)]
pub struct CourseProgressResponse {
    pub course_id: String,
    pub progress: i32,
    pub completed_lessons: Vec<String>,
    pub course: CourseProgressInfo,
}

/// Per-course progress entry in the parent/instructor overview
#[derive(Debug, Serialize)]
pub struct StudentCourseProgress {
    pub course_id: String,
    pub title: String,
    pub progress: i32,
    pub completed_lessons: i64,
    pub total_lessons: i64,
}

/// One student row in the parent/instructor overview
#[derive(Debug, Serialize)]
pub struct StudentProgressReport {
    pub id: String,
    pub name: String,
    pub courses: Vec<StudentCourseProgress>,
}

/// Progress percentage = completed / total, recomputed on read and never
/// stored. A course with zero lessons reports zero.
pub fn progress_percent(completed_lessons: u64, total_lessons: u64) -> i32 {
    if total_lessons == 0 {
        return 0;
    }
    ((completed_lessons as f64 / total_lessons as f64) * 100.0).round() as i32
}
