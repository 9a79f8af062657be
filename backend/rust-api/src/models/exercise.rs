use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::bson_datetime_as_chrono;

/// Kind of interactive exercise attached to a lesson
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    DragAndDrop,
    Quiz,
}

impl ExerciseType {
    pub fn as_str(&self) -> &str {
        match self {
            ExerciseType::DragAndDrop => "drag_and_drop",
            ExerciseType::Quiz => "quiz",
        }
    }
}

/// Exercise stored in MongoDB "exercises" collection.
///
/// `content` is a free-form JSON blob: for drag-and-drop it holds
/// `{blocks: [...], categories: [...]}`, for quizzes a question list.
/// The server stores and serves it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "lessonId")]
    pub lesson_id: ObjectId,
    pub title: String,
    #[serde(rename = "titleAr", default, skip_serializing_if = "Option::is_none")]
    pub title_ar: Option<String>,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub content: serde_json::Value,
}

/// Exercise representation returned to clients
#[derive(Debug, Serialize)]
pub struct ExerciseResponse {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_ar: Option<String>,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    pub content: serde_json::Value,
}

impl From<Exercise> for ExerciseResponse {
    fn from(exercise: Exercise) -> Self {
        ExerciseResponse {
            id: exercise.id.map(|id| id.to_hex()).unwrap_or_default(),
            lesson_id: exercise.lesson_id.to_hex(),
            title: exercise.title,
            title_ar: exercise.title_ar,
            exercise_type: exercise.exercise_type,
            content: exercise.content,
        }
    }
}

/// Request to create an exercise
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExerciseRequest {
    #[validate(length(min = 1, message = "عنوان التمرين مطلوب"))]
    pub title: String,

    pub title_ar: Option<String>,

    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,

    pub content: serde_json::Value,

    pub lesson_id: String,
}

/// Request to submit an exercise attempt (PUT /api/v1/exercises)
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    pub exercise_id: String,

    #[validate(range(min = 0, max = 100, message = "النتيجة يجب أن تكون بين 0 و 100"))]
    pub score: i32,

    pub answers: serde_json::Value,

    pub time_spent: Option<i32>,
}

/// Append-only attempt record in "exercise_attempts"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseAttempt {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    #[serde(rename = "exerciseId")]
    pub exercise_id: ObjectId,
    pub score: i32,
    pub answers: serde_json::Value,
    #[serde(rename = "timeSpent", default)]
    pub time_spent: i32,
    #[serde(rename = "completedAt", with = "bson_datetime_as_chrono")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExerciseAttemptResponse {
    pub id: String,
    pub exercise_id: String,
    pub score: i32,
    pub answers: serde_json::Value,
    pub time_spent: i32,
    pub completed_at: DateTime<Utc>,
}

impl From<ExerciseAttempt> for ExerciseAttemptResponse {
    fn from(attempt: ExerciseAttempt) -> Self {
        ExerciseAttemptResponse {
            id: attempt.id.map(|id| id.to_hex()).unwrap_or_default(),
            exercise_id: attempt.exercise_id.to_hex(),
            score: attempt.score,
            answers: attempt.answers,
            time_spent: attempt.time_spent,
            completed_at: attempt.completed_at,
        }
    }
}

/// Query params for listing exercises
#[derive(Debug, Deserialize)]
pub struct ListExercisesQuery {
    #[serde(rename = "type")]
    pub exercise_type: Option<String>,
    pub lesson_id: Option<String>,
}
