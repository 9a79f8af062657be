use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use crate::messages;
use crate::models::feedback::{
    CreateFeedbackRequest, Feedback, FeedbackParticipant, FeedbackResponse, ListFeedbackQuery,
};
use crate::models::user::User;

pub struct FeedbackService {
    mongo: Database,
}

impl FeedbackService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Create a feedback entry from the caller to another user
    pub async fn create_feedback(
        &self,
        provider_id: ObjectId,
        req: CreateFeedbackRequest,
    ) -> Result<FeedbackResponse> {
        let receiver_id =
            ObjectId::parse_str(&req.receiver_id).context("Invalid receiver ID format")?;
        let course_id =
            ObjectId::parse_str(&req.course_id).context("Invalid course ID format")?;
        let lesson_id = match &req.lesson_id {
            Some(raw) => Some(ObjectId::parse_str(raw).context("Invalid lesson ID format")?),
            None => None,
        };

        let receiver = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": receiver_id })
            .await
            .context("Failed to query receiver")?
            .ok_or_else(|| anyhow!(messages::USER_NOT_FOUND))?;

        let feedback = Feedback {
            id: None,
            provider_id,
            receiver_id,
            course_id,
            lesson_id,
            content: req.content,
            created_at: Utc::now(),
        };

        let insert_result = self
            .mongo
            .collection::<Feedback>("feedback")
            .insert_one(&feedback)
            .await
            .context("Failed to insert feedback")?;

        let provider = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": provider_id })
            .await
            .context("Failed to query provider")?;

        let mut created = feedback;
        created.id = insert_result.inserted_id.as_object_id();

        Ok(Self::to_response(
            created,
            provider.as_ref(),
            Some(&receiver),
        ))
    }

    /// Feedback visible to the caller (as provider or receiver), newest
    /// first, enriched with participant names/roles
    pub async fn list_feedback(
        &self,
        caller_id: ObjectId,
        query: ListFeedbackQuery,
    ) -> Result<Vec<FeedbackResponse>> {
        let mut filter = Document::new();

        if let Some(course_id) = &query.course_id {
            let course_oid =
                ObjectId::parse_str(course_id).context("Invalid course ID format")?;
            filter.insert("courseId", course_oid);
        }

        if let Some(lesson_id) = &query.lesson_id {
            let lesson_oid =
                ObjectId::parse_str(lesson_id).context("Invalid lesson ID format")?;
            filter.insert("lessonId", lesson_oid);
        }

        filter.insert(
            "$or",
            vec![
                doc! { "providerId": caller_id },
                doc! { "receiverId": caller_id },
            ],
        );

        let mut cursor = self
            .mongo
            .collection::<Feedback>("feedback")
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await
            .context("Failed to query feedback")?;

        let mut entries = Vec::new();
        while let Some(entry) = cursor.try_next().await.context("Failed to read feedback")? {
            entries.push(entry);
        }

        let participants = self.load_participants(&entries).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let provider = participants.get(&entry.provider_id);
                let receiver = participants.get(&entry.receiver_id);
                Self::to_response(entry, provider, receiver)
            })
            .collect())
    }

    async fn load_participants(&self, entries: &[Feedback]) -> Result<HashMap<ObjectId, User>> {
        let mut ids = Vec::new();
        for entry in entries {
            if !ids.contains(&entry.provider_id) {
                ids.push(entry.provider_id);
            }
            if !ids.contains(&entry.receiver_id) {
                ids.push(entry.receiver_id);
            }
        }

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut cursor = self
            .mongo
            .collection::<User>("users")
            .find(doc! { "_id": { "$in": ids } })
            .await
            .context("Failed to query participants")?;

        let mut map = HashMap::new();
        while let Some(user) = cursor.try_next().await.context("Failed to read participant")? {
            if let Some(id) = user.id {
                map.insert(id, user);
            }
        }
        Ok(map)
    }

    fn to_response(
        feedback: Feedback,
        provider: Option<&User>,
        receiver: Option<&User>,
    ) -> FeedbackResponse {
        FeedbackResponse {
            id: feedback.id.map(|id| id.to_hex()).unwrap_or_default(),
            content: feedback.content,
            course_id: feedback.course_id.to_hex(),
            lesson_id: feedback.lesson_id.map(|id| id.to_hex()),
            created_at: feedback.created_at,
            provider: provider.map(|user| FeedbackParticipant {
                name: user.name.clone(),
                role: user.role,
            }),
            receiver: receiver.map(|user| FeedbackParticipant {
                name: user.name.clone(),
                role: user.role,
            }),
        }
    }
}
