use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use crate::messages;
use crate::metrics::ENROLLMENTS_TOTAL;
use crate::models::course::Course;
use crate::models::enrollment::{
    EnrolledCourseSummary, Enrollment, EnrollmentResponse, EnrollmentStatus,
};
use crate::models::lesson::Lesson;
use crate::models::progress::{progress_percent, LessonProgress};

const DEFAULT_COURSE_IMAGE: &str = "/default-course-image.jpg";

pub struct EnrollmentService {
    mongo: Database,
}

impl EnrollmentService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Enroll a user into a course. At most one enrollment may exist per
    /// (user, course) pair; a second attempt is rejected.
    pub async fn enroll(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
        exercise_id: ObjectId,
    ) -> Result<EnrollmentResponse> {
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");

        let existing = enrollments_collection
            .find_one(doc! { "userId": user_id, "courseId": course_id })
            .await
            .context("Failed to check existing enrollment")?;

        if existing.is_some() {
            return Err(anyhow!(messages::ALREADY_ENROLLED));
        }

        let enrollment = Enrollment {
            id: None,
            user_id,
            course_id,
            exercise_id,
            status: EnrollmentStatus::InProgress,
            created_at: Utc::now(),
        };

        let insert_result = enrollments_collection
            .insert_one(&enrollment)
            .await
            .context(messages::ENROLLMENT_FAILED)?;

        let enrollment_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted enrollment ID"))?;

        ENROLLMENTS_TOTAL.with_label_values(&["created"]).inc();

        tracing::info!(
            user_id = %user_id.to_hex(),
            course_id = %course_id.to_hex(),
            "User enrolled in course"
        );

        let mut created = enrollment;
        created.id = Some(enrollment_id);
        Ok(EnrollmentResponse::from(created))
    }

    /// The caller's enrollments rendered as "my courses" summaries with
    /// recomputed progress and the next incomplete lesson.
    pub async fn list_enrolled_courses(
        &self,
        user_id: ObjectId,
    ) -> Result<Vec<EnrolledCourseSummary>> {
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let mut cursor = enrollments_collection
            .find(doc! { "userId": user_id })
            .await
            .context("Failed to query enrollments")?;

        let mut summaries = Vec::new();
        while let Some(enrollment) = cursor.try_next().await.context("Failed to read enrollment")? {
            let Some(course) = self
                .mongo
                .collection::<Course>("courses")
                .find_one(doc! { "_id": enrollment.course_id })
                .await
                .context("Failed to query course")?
            else {
                // Enrollment pointing at a deleted course is skipped
                continue;
            };

            let lessons = self.load_lessons(&enrollment.course_id).await?;
            let completed_lessons = self.load_completed_lessons(&enrollment).await?;

            let progress =
                progress_percent(completed_lessons.len() as u64, lessons.len() as u64);

            let next_lesson = lessons
                .iter()
                .find(|lesson| {
                    lesson
                        .id
                        .map(|id| !completed_lessons.contains(&id))
                        .unwrap_or(false)
                })
                .map(|lesson| {
                    let title = lesson.title_ar.as_deref().unwrap_or(&lesson.title);
                    format!("{}: {}", messages::NEXT_LESSON_PREFIX, title)
                });

            summaries.push(EnrolledCourseSummary {
                id: enrollment.course_id.to_hex(),
                title: course.title,
                description: course.description,
                image_url: course
                    .image_url
                    .unwrap_or_else(|| DEFAULT_COURSE_IMAGE.to_string()),
                progress,
                next_lesson,
                completed: progress == 100,
            });
        }

        Ok(summaries)
    }

    /// Find the caller's enrollment for a course, if any
    pub async fn find_enrollment(
        &self,
        user_id: ObjectId,
        course_id: ObjectId,
    ) -> Result<Option<Enrollment>> {
        self.mongo
            .collection::<Enrollment>("enrollments")
            .find_one(doc! { "userId": user_id, "courseId": course_id })
            .await
            .context("Failed to query enrollment")
    }

    async fn load_lessons(&self, course_id: &ObjectId) -> Result<Vec<Lesson>> {
        let mut cursor = self
            .mongo
            .collection::<Lesson>("lessons")
            .find(doc! { "courseId": course_id })
            .sort(doc! { "order": 1 })
            .await
            .context("Failed to query lessons")?;

        let mut lessons = Vec::new();
        while let Some(lesson) = cursor.try_next().await.context("Failed to read lesson")? {
            lessons.push(lesson);
        }
        Ok(lessons)
    }

    async fn load_completed_lessons(&self, enrollment: &Enrollment) -> Result<Vec<ObjectId>> {
        let Some(enrollment_id) = enrollment.id else {
            return Ok(Vec::new());
        };

        let mut cursor = self
            .mongo
            .collection::<LessonProgress>("lesson_progress")
            .find(doc! { "enrollmentId": enrollment_id, "completed": true })
            .await
            .context("Failed to query lesson progress")?;

        let mut completed = Vec::new();
        while let Some(progress) = cursor
            .try_next()
            .await
            .context("Failed to read lesson progress")?
        {
            completed.push(progress.lesson_id);
        }
        Ok(completed)
    }
}
