use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use crate::messages;
use crate::metrics::QUIZ_ATTEMPTS_TOTAL;
use crate::models::course::Course;
use crate::models::quiz::{
    CreateQuizAttemptRequest, CreateQuizRequest, Quiz, QuizAttempt, QuizAttemptResponse,
    QuizResponse,
};

const PASSING_SCORE: i32 = 60;

pub struct QuizService {
    mongo: Database,
}

impl QuizService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// List all quizzes with their embedded questions
    pub async fn list_quizzes(&self) -> Result<Vec<QuizResponse>> {
        let mut cursor = self
            .mongo
            .collection::<Quiz>("quizzes")
            .find(doc! {})
            .await
            .context("Failed to query quizzes")?;

        let mut quizzes = Vec::new();
        while let Some(quiz) = cursor.try_next().await.context("Failed to read quiz")? {
            quizzes.push(QuizResponse::from(quiz));
        }
        Ok(quizzes)
    }

    /// Create a quiz for an existing course, questions embedded
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<QuizResponse> {
        let course_oid =
            ObjectId::parse_str(&req.course_id).context("Invalid course ID format")?;

        let course = self
            .mongo
            .collection::<Course>("courses")
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?;

        if course.is_none() {
            return Err(anyhow!(messages::COURSE_NOT_FOUND));
        }

        let quiz = Quiz {
            id: None,
            course_id: course_oid,
            title: req.title,
            description: req.description,
            questions: req.questions,
            created_at: Utc::now(),
        };

        let insert_result = self
            .mongo
            .collection::<Quiz>("quizzes")
            .insert_one(&quiz)
            .await
            .context("Failed to insert quiz")?;

        let quiz_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted quiz ID"))?;

        let mut created = quiz;
        created.id = Some(quiz_id);
        Ok(QuizResponse::from(created))
    }

    /// Record a quiz attempt (append-only)
    pub async fn submit_attempt(
        &self,
        user_id: ObjectId,
        req: CreateQuizAttemptRequest,
    ) -> Result<QuizAttemptResponse> {
        let quiz_oid = ObjectId::parse_str(&req.quiz_id).context("Invalid quiz ID format")?;

        let quiz = self
            .mongo
            .collection::<Quiz>("quizzes")
            .find_one(doc! { "_id": quiz_oid })
            .await
            .context("Failed to query quiz")?;

        if quiz.is_none() {
            return Err(anyhow!(messages::QUIZ_NOT_FOUND));
        }

        let attempt = QuizAttempt {
            id: None,
            user_id,
            quiz_id: quiz_oid,
            score: req.score,
            answers: req.answers,
            completed_at: Utc::now(),
        };

        let insert_result = self
            .mongo
            .collection::<QuizAttempt>("quiz_attempts")
            .insert_one(&attempt)
            .await
            .context("Failed to insert quiz attempt")?;

        let result = if req.score >= PASSING_SCORE {
            "passed"
        } else {
            "failed"
        };
        QUIZ_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();

        let mut created = attempt;
        created.id = insert_result.inserted_id.as_object_id();
        Ok(QuizAttemptResponse::from(created))
    }

    /// The caller's attempts for a quiz, newest first
    pub async fn list_attempts(
        &self,
        user_id: ObjectId,
        quiz_id: &str,
    ) -> Result<Vec<QuizAttemptResponse>> {
        let quiz_oid = ObjectId::parse_str(quiz_id).context("Invalid quiz ID format")?;

        let mut cursor = self
            .mongo
            .collection::<QuizAttempt>("quiz_attempts")
            .find(doc! { "quizId": quiz_oid, "userId": user_id })
            .sort(doc! { "completedAt": -1 })
            .await
            .context("Failed to query quiz attempts")?;

        let mut attempts = Vec::new();
        while let Some(attempt) = cursor.try_next().await.context("Failed to read attempt")? {
            attempts.push(QuizAttemptResponse::from(attempt));
        }
        Ok(attempts)
    }
}
