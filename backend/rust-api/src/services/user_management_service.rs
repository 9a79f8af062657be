use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document, Regex};
use mongodb::Database;

use crate::messages;
use crate::models::enrollment::Enrollment;
use crate::models::user::{ListUsersQuery, User, UserProfile, UserRole};

pub struct UserManagementService {
    mongo: Database,
}

impl UserManagementService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// List users with filters and pagination, newest first
    pub async fn list_users(&self, query: ListUsersQuery) -> Result<Vec<UserProfile>> {
        let users_collection = self.mongo.collection::<User>("users");

        let mut filter = doc! {};

        if let Some(role) = query.role {
            filter.insert("role", role);
        }

        if let Some(search) = query.search {
            // Search by email or name (case-insensitive)
            let regex = Regex {
                pattern: search,
                options: "i".to_string(),
            };
            filter.insert(
                "$or",
                vec![doc! { "email": &regex }, doc! { "name": &regex }],
            );
        }

        let limit = query.limit.unwrap_or(50).min(100) as i64;
        let offset = query.offset.unwrap_or(0) as u64;

        let mut cursor = users_collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .skip(offset)
            .limit(limit)
            .await
            .context("Failed to query users")?;

        let mut users = Vec::new();
        while let Some(user) = cursor.try_next().await.context("Failed to read user")? {
            users.push(UserProfile::from(user));
        }

        Ok(users)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        let object_id = ObjectId::parse_str(user_id).context("Invalid user ID format")?;

        let user = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow!(messages::USER_NOT_FOUND))?;

        Ok(UserProfile::from(user))
    }

    /// Change a user's role.
    ///
    /// Demoting the sole remaining admin is refused: the system must never
    /// end up without an admin account.
    pub async fn change_role(&self, user_id: &str, new_role: UserRole) -> Result<UserProfile> {
        let users_collection = self.mongo.collection::<User>("users");
        let object_id = ObjectId::parse_str(user_id).context("Invalid user ID format")?;

        let user = users_collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow!(messages::USER_NOT_FOUND))?;

        if user.role == UserRole::Admin && new_role != UserRole::Admin {
            let admin_count = self.count_admins().await?;
            if admin_count <= 1 {
                return Err(anyhow!(messages::LAST_ADMIN_PROTECTED));
            }
        }

        users_collection
            .update_one(
                doc! { "_id": object_id },
                doc! {
                    "$set": {
                        "role": new_role.as_str(),
                        "updatedAt": mongodb::bson::DateTime::from_millis(
                            Utc::now().timestamp_millis()
                        ),
                    }
                },
            )
            .await
            .context("Failed to update user role")?;

        let updated = users_collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to fetch updated user")?
            .ok_or_else(|| anyhow!(messages::USER_NOT_FOUND))?;

        Ok(UserProfile::from(updated))
    }

    /// Delete a user and cascade their refresh tokens, enrollments and
    /// progress rows. Deleting the sole remaining admin is refused.
    pub async fn delete_user(&self, user_id: &str) -> Result<UserProfile> {
        let users_collection = self.mongo.collection::<User>("users");
        let object_id = ObjectId::parse_str(user_id).context("Invalid user ID format")?;

        let user = users_collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow!(messages::USER_NOT_FOUND))?;

        if user.role == UserRole::Admin {
            let admin_count = self.count_admins().await?;
            if admin_count <= 1 {
                return Err(anyhow!(messages::LAST_ADMIN_PROTECTED));
            }
        }

        // Collect enrollment ids so per-enrollment progress can be removed
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let mut cursor = enrollments_collection
            .find(doc! { "userId": object_id })
            .await
            .context("Failed to query enrollments")?;

        let mut enrollment_ids = Vec::new();
        while let Some(enrollment) = cursor.try_next().await.context("Failed to read enrollment")? {
            if let Some(id) = enrollment.id {
                enrollment_ids.push(id);
            }
        }

        let result = users_collection
            .delete_one(doc! { "_id": object_id })
            .await
            .context("Failed to delete user")?;

        if result.deleted_count == 0 {
            return Err(anyhow!(messages::USER_NOT_FOUND));
        }

        self.mongo
            .collection::<Document>("refresh_tokens")
            .delete_many(doc! { "userId": object_id })
            .await
            .context("Failed to delete refresh tokens")?;

        if !enrollment_ids.is_empty() {
            self.mongo
                .collection::<Document>("lesson_progress")
                .delete_many(doc! { "enrollmentId": { "$in": &enrollment_ids } })
                .await
                .context("Failed to delete lesson progress")?;
        }

        enrollments_collection
            .delete_many(doc! { "userId": object_id })
            .await
            .context("Failed to delete enrollments")?;

        self.mongo
            .collection::<Document>("user_progress")
            .delete_many(doc! { "userId": object_id })
            .await
            .context("Failed to delete user progress")?;

        Ok(UserProfile::from(user))
    }

    /// Count users holding the admin role
    pub async fn count_admins(&self) -> Result<u64> {
        self.mongo
            .collection::<User>("users")
            .count_documents(doc! { "role": UserRole::Admin.as_str() })
            .await
            .context("Failed to count admins")
    }
}
