use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use crate::messages;
use crate::metrics::{EXERCISE_ATTEMPTS_TOTAL, LESSONS_COMPLETED_TOTAL};
use crate::models::enrollment::Enrollment;
use crate::models::exercise::{
    CreateExerciseRequest, Exercise, ExerciseAttempt, ExerciseAttemptResponse, ExerciseResponse,
    ListExercisesQuery, SubmitAttemptRequest,
};
use crate::models::lesson::Lesson;

pub struct ExerciseService {
    mongo: Database,
}

impl ExerciseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// List exercises, optionally filtered by type and lesson
    pub async fn list_exercises(&self, query: ListExercisesQuery) -> Result<Vec<ExerciseResponse>> {
        let mut filter = Document::new();

        if let Some(exercise_type) = &query.exercise_type {
            filter.insert("type", exercise_type);
        }

        if let Some(lesson_id) = &query.lesson_id {
            let lesson_oid =
                ObjectId::parse_str(lesson_id).context("Invalid lesson ID format")?;
            filter.insert("lessonId", lesson_oid);
        }

        let mut cursor = self
            .mongo
            .collection::<Exercise>("exercises")
            .find(filter)
            .await
            .context("Failed to query exercises")?;

        let mut exercises = Vec::new();
        while let Some(exercise) = cursor.try_next().await.context("Failed to read exercise")? {
            exercises.push(ExerciseResponse::from(exercise));
        }
        Ok(exercises)
    }

    /// Create an exercise attached to an existing lesson. The content blob
    /// is stored verbatim.
    pub async fn create_exercise(&self, req: CreateExerciseRequest) -> Result<ExerciseResponse> {
        let lesson_oid =
            ObjectId::parse_str(&req.lesson_id).context("Invalid lesson ID format")?;

        let lesson = self
            .mongo
            .collection::<Lesson>("lessons")
            .find_one(doc! { "_id": lesson_oid })
            .await
            .context("Failed to query lesson")?;

        if lesson.is_none() {
            return Err(anyhow!(messages::LESSON_NOT_FOUND));
        }

        let exercise = Exercise {
            id: None,
            lesson_id: lesson_oid,
            title: req.title,
            title_ar: req.title_ar,
            exercise_type: req.exercise_type,
            content: req.content,
        };

        let insert_result = self
            .mongo
            .collection::<Exercise>("exercises")
            .insert_one(&exercise)
            .await
            .context("Failed to insert exercise")?;

        let exercise_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted exercise ID"))?;

        let mut created = exercise;
        created.id = Some(exercise_id);
        Ok(ExerciseResponse::from(created))
    }

    /// Record an exercise attempt and fold it into lesson progress.
    ///
    /// The attempt itself is append-only. When the exercise belongs to a
    /// lesson of a course the user is enrolled in, the lesson is marked
    /// complete via an upsert keyed by (enrollmentId, lessonId).
    pub async fn submit_attempt(
        &self,
        user_id: ObjectId,
        req: SubmitAttemptRequest,
    ) -> Result<ExerciseAttemptResponse> {
        let exercise_oid =
            ObjectId::parse_str(&req.exercise_id).context("Invalid exercise ID format")?;

        let exercise = self
            .mongo
            .collection::<Exercise>("exercises")
            .find_one(doc! { "_id": exercise_oid })
            .await
            .context("Failed to query exercise")?
            .ok_or_else(|| anyhow!(messages::EXERCISE_NOT_FOUND))?;

        let time_spent = req.time_spent.unwrap_or(0);

        let attempt = ExerciseAttempt {
            id: None,
            user_id,
            exercise_id: exercise_oid,
            score: req.score,
            answers: req.answers,
            time_spent,
            completed_at: Utc::now(),
        };

        let insert_result = self
            .mongo
            .collection::<ExerciseAttempt>("exercise_attempts")
            .insert_one(&attempt)
            .await
            .context("Failed to insert exercise attempt")?;

        EXERCISE_ATTEMPTS_TOTAL
            .with_label_values(&[exercise.exercise_type.as_str()])
            .inc();

        // Fold the attempt into per-enrollment lesson progress
        let lesson = self
            .mongo
            .collection::<Lesson>("lessons")
            .find_one(doc! { "_id": exercise.lesson_id })
            .await
            .context("Failed to query lesson")?;

        if let Some(lesson) = lesson {
            let enrollment = self
                .mongo
                .collection::<Enrollment>("enrollments")
                .find_one(doc! { "userId": user_id, "courseId": lesson.course_id })
                .await
                .context("Failed to query enrollment")?;

            if let Some(enrollment) = enrollment {
                if let Some(enrollment_id) = enrollment.id {
                    self.upsert_lesson_progress(
                        enrollment_id,
                        exercise.lesson_id,
                        req.score,
                        time_spent,
                    )
                    .await?;

                    LESSONS_COMPLETED_TOTAL
                        .with_label_values(&["exercise_attempt"])
                        .inc();
                }
            }
        }

        let mut created = attempt;
        created.id = insert_result.inserted_id.as_object_id();
        Ok(ExerciseAttemptResponse::from(created))
    }

    async fn upsert_lesson_progress(
        &self,
        enrollment_id: ObjectId,
        lesson_id: ObjectId,
        score: i32,
        time_spent: i32,
    ) -> Result<()> {
        self.mongo
            .collection::<Document>("lesson_progress")
            .update_one(
                doc! { "enrollmentId": enrollment_id, "lessonId": lesson_id },
                doc! {
                    "$set": {
                        "completed": true,
                        "score": score,
                        "timeSpent": time_spent,
                        "updatedAt": mongodb::bson::DateTime::now(),
                    },
                },
            )
            .upsert(true)
            .await
            .context("Failed to upsert lesson progress")?;

        Ok(())
    }
}
