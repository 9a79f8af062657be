use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::bson_datetime_as_chrono;

/// Single question embedded in a quiz document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub text: String,
    #[serde(rename = "textAr", default, skip_serializing_if = "Option::is_none")]
    pub text_ar: Option<String>,
    pub options: Vec<String>,
    #[serde(rename = "correctIndex")]
    pub correct_index: i32,
}

/// Quiz stored in MongoDB "quizzes" collection, questions embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "courseId")]
    pub course_id: ObjectId,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

impl From<Quiz> for QuizResponse {
    fn from(quiz: Quiz) -> Self {
        QuizResponse {
            id: quiz.id.map(|id| id.to_hex()).unwrap_or_default(),
            course_id: quiz.course_id.to_hex(),
            title: quiz.title,
            description: quiz.description,
            questions: quiz.questions,
            created_at: quiz.created_at,
        }
    }
}

/// Request to create a quiz with embedded questions
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, message = "عنوان الاختبار مطلوب"))]
    pub title: String,

    pub description: String,

    pub course_id: String,

    #[validate(length(min = 1, message = "الاختبار يحتاج سؤالاً واحداً على الأقل"))]
    pub questions: Vec<QuizQuestion>,
}

/// Append-only attempt record in "quiz_attempts"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userId")]
    pub user_id: ObjectId,
    #[serde(rename = "quizId")]
    pub quiz_id: ObjectId,
    pub score: i32,
    pub answers: serde_json::Value,
    #[serde(rename = "completedAt", with = "bson_datetime_as_chrono")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuizAttemptResponse {
    pub id: String,
    pub quiz_id: String,
    pub score: i32,
    pub answers: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

impl From<QuizAttempt> for QuizAttemptResponse {
    fn from(attempt: QuizAttempt) -> Self {
        QuizAttemptResponse {
            id: attempt.id.map(|id| id.to_hex()).unwrap_or_default(),
            quiz_id: attempt.quiz_id.to_hex(),
            score: attempt.score,
            answers: attempt.answers,
            completed_at: attempt.completed_at,
        }
    }
}

/// Request to record a quiz attempt
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizAttemptRequest {
    pub quiz_id: String,

    #[validate(range(min = 0, max = 100, message = "النتيجة يجب أن تكون بين 0 و 100"))]
    pub score: i32,

    pub answers: serde_json::Value,
}

/// Query params for listing quiz attempts
#[derive(Debug, Deserialize)]
pub struct ListQuizAttemptsQuery {
    pub quiz_id: Option<String>,
}
