use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::lesson::LessonInfo;
use super::user::bson_datetime_as_chrono;

/// Course difficulty level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &str {
        match self {
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "beginner" => Some(CourseLevel::Beginner),
            "intermediate" => Some(CourseLevel::Intermediate),
            "advanced" => Some(CourseLevel::Advanced),
            _ => None,
        }
    }
}

/// Course stored in MongoDB "courses" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    pub price: f64,
    /// Total duration in minutes
    pub duration: i32,
    #[serde(rename = "instructorId")]
    pub instructor_id: ObjectId,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "isPublished", default)]
    pub is_published: bool,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

/// Course fields collected from the multipart create form
#[derive(Debug, Default, Validate)]
pub struct CourseFields {
    #[validate(length(min = 1, message = "عنوان الدورة مطلوب"))]
    pub title: String,

    #[validate(length(min = 1, message = "وصف الدورة مطلوب"))]
    pub description: String,

    #[validate(range(min = 0.0, message = "السعر يجب ألا يكون سالباً"))]
    pub price: f64,

    #[validate(range(min = 0, message = "المدة يجب ألا تكون سالبة"))]
    pub duration: i32,
}

#[derive(Debug, Serialize)]
pub struct InstructorInfo {
    pub name: String,
    pub email: String,
}

/// Course representation returned by list/detail endpoints
#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub level: CourseLevel,
    pub price: f64,
    pub duration: i32,
    pub instructor_id: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<InstructorInfo>,
}

impl CourseResponse {
    pub fn from_course(course: Course, instructor: Option<InstructorInfo>) -> Self {
        CourseResponse {
            id: course.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: course.title,
            description: course.description,
            level: course.level,
            price: course.price,
            duration: course.duration,
            instructor_id: course.instructor_id.to_hex(),
            image_url: course.image_url,
            is_published: course.is_published,
            created_at: course.created_at,
            instructor,
        }
    }
}

/// Course detail with its ordered lessons
#[derive(Debug, Serialize)]
pub struct CourseDetailResponse {
    #[serde(flatten)]
    pub course: CourseResponse,
    pub lessons: Vec<LessonInfo>,
}

/// Query params for listing courses
#[derive(Debug, Deserialize)]
pub struct ListCoursesQuery {
    pub instructor_id: Option<String>,
    pub is_published: Option<bool>,
}
