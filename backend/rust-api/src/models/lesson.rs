use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Lesson stored in MongoDB "lessons" collection, ordered within a course.
/// Content carries localized variants alongside the default text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "courseId")]
    pub course_id: ObjectId,
    pub title: String,
    #[serde(rename = "titleAr", default, skip_serializing_if = "Option::is_none")]
    pub title_ar: Option<String>,
    pub content: String,
    #[serde(rename = "contentAr", default, skip_serializing_if = "Option::is_none")]
    pub content_ar: Option<String>,
    /// Duration in minutes
    pub duration: i32,
    pub order: i32,
    #[serde(rename = "isPublished", default)]
    pub is_published: bool,
}

/// Lesson summary embedded in course detail responses
#[derive(Debug, Serialize)]
pub struct LessonInfo {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_ar: Option<String>,
    pub duration: i32,
    pub order: i32,
}

impl From<Lesson> for LessonInfo {
    fn from(lesson: Lesson) -> Self {
        LessonInfo {
            id: lesson.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: lesson.title,
            title_ar: lesson.title_ar,
            duration: lesson.duration,
            order: lesson.order,
        }
    }
}
