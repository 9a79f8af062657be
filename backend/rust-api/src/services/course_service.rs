use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use crate::messages;
use crate::models::course::{
    Course, CourseDetailResponse, CourseFields, CourseLevel, CourseResponse, InstructorInfo,
    ListCoursesQuery,
};
use crate::models::enrollment::Enrollment;
use crate::models::lesson::{Lesson, LessonInfo};
use crate::models::user::{User, UserRole};

pub struct CourseService {
    mongo: Database,
}

impl CourseService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Create a course owned by the given instructor. The image has already
    /// been written to disk; `image_url` is its public path.
    pub async fn create_course(
        &self,
        fields: CourseFields,
        level: CourseLevel,
        instructor_id: ObjectId,
        image_url: String,
    ) -> Result<CourseResponse> {
        let courses_collection = self.mongo.collection::<Course>("courses");

        let now = Utc::now();
        let course = Course {
            id: None,
            title: fields.title,
            description: fields.description,
            level,
            price: fields.price,
            duration: fields.duration,
            instructor_id,
            image_url: Some(image_url),
            is_published: false, // new courses start unpublished
            created_at: now,
            updated_at: now,
        };

        let insert_result = courses_collection
            .insert_one(&course)
            .await
            .context(messages::COURSE_CREATE_FAILED)?;

        let course_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("Failed to get inserted course ID"))?;

        let mut created = course;
        created.id = Some(course_id);

        Ok(CourseResponse::from_course(created, None))
    }

    /// List courses with optional filters. Instructors only ever see their
    /// own courses; each entry carries instructor {name, email}.
    pub async fn list_courses(
        &self,
        query: ListCoursesQuery,
        caller_id: &str,
        caller_role: UserRole,
    ) -> Result<Vec<CourseResponse>> {
        let courses_collection = self.mongo.collection::<Course>("courses");

        let mut filter = Document::new();

        if caller_role == UserRole::Instructor {
            let caller_oid = ObjectId::parse_str(caller_id).context("Invalid user ID format")?;
            filter.insert("instructorId", caller_oid);
        } else if let Some(instructor_id) = &query.instructor_id {
            let instructor_oid =
                ObjectId::parse_str(instructor_id).context("Invalid instructor ID format")?;
            filter.insert("instructorId", instructor_oid);
        }

        if let Some(is_published) = query.is_published {
            filter.insert("isPublished", is_published);
        }

        let mut cursor = courses_collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await
            .context("Failed to query courses")?;

        let mut courses = Vec::new();
        while let Some(course) = cursor.try_next().await.context("Failed to read course")? {
            courses.push(course);
        }

        let instructors = self.load_instructors(&courses).await?;

        Ok(courses
            .into_iter()
            .map(|course| {
                let instructor = instructors.get(&course.instructor_id).map(|user| {
                    InstructorInfo {
                        name: user.name.clone(),
                        email: user.email.clone(),
                    }
                });
                CourseResponse::from_course(course, instructor)
            })
            .collect())
    }

    /// Course detail plus its lessons ordered by `order`
    pub async fn get_course(&self, course_id: &str) -> Result<CourseDetailResponse> {
        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let course = self
            .mongo
            .collection::<Course>("courses")
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!(messages::COURSE_NOT_FOUND))?;

        let lessons = self.load_lessons(&course_oid).await?;

        let instructor = self
            .mongo
            .collection::<User>("users")
            .find_one(doc! { "_id": course.instructor_id })
            .await
            .context("Failed to query instructor")?
            .map(|user| InstructorInfo {
                name: user.name,
                email: user.email,
            });

        Ok(CourseDetailResponse {
            course: CourseResponse::from_course(course, instructor),
            lessons: lessons.into_iter().map(LessonInfo::from).collect(),
        })
    }

    /// Delete a course and cascade its lessons, enrollments and progress.
    /// Only the owning instructor or an admin may delete.
    /// Returns the stored image URL so the caller can remove the file.
    pub async fn delete_course(
        &self,
        course_id: &str,
        caller_id: &str,
        caller_role: UserRole,
    ) -> Result<Option<String>> {
        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let courses_collection = self.mongo.collection::<Course>("courses");
        let course = courses_collection
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!(messages::COURSE_NOT_FOUND))?;

        if caller_role != UserRole::Admin {
            let caller_oid = ObjectId::parse_str(caller_id).context("Invalid user ID format")?;
            if course.instructor_id != caller_oid {
                return Err(anyhow!(messages::FORBIDDEN));
            }
        }

        // Collect enrollment ids first so lesson_progress rows can be removed
        let enrollments_collection = self.mongo.collection::<Enrollment>("enrollments");
        let mut cursor = enrollments_collection
            .find(doc! { "courseId": course_oid })
            .await
            .context("Failed to query enrollments")?;

        let mut enrollment_ids = Vec::new();
        while let Some(enrollment) = cursor.try_next().await.context("Failed to read enrollment")? {
            if let Some(id) = enrollment.id {
                enrollment_ids.push(id);
            }
        }

        if !enrollment_ids.is_empty() {
            self.mongo
                .collection::<Document>("lesson_progress")
                .delete_many(doc! { "enrollmentId": { "$in": &enrollment_ids } })
                .await
                .context("Failed to delete lesson progress")?;
        }

        self.mongo
            .collection::<Document>("user_progress")
            .delete_many(doc! { "courseId": course_oid })
            .await
            .context("Failed to delete user progress")?;

        enrollments_collection
            .delete_many(doc! { "courseId": course_oid })
            .await
            .context("Failed to delete enrollments")?;

        self.mongo
            .collection::<Document>("lessons")
            .delete_many(doc! { "courseId": course_oid })
            .await
            .context("Failed to delete lessons")?;

        courses_collection
            .delete_one(doc! { "_id": course_oid })
            .await
            .context("Failed to delete course")?;

        Ok(course.image_url)
    }

    async fn load_lessons(&self, course_id: &ObjectId) -> Result<Vec<Lesson>> {
        let lessons_collection = self.mongo.collection::<Lesson>("lessons");
        let mut cursor = lessons_collection
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

    async fn load_instructors(&self, courses: &[Course]) -> Result<HashMap<ObjectId, User>> {
        let ids: Vec<ObjectId> = courses.iter().map(|c| c.instructor_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users_collection = self.mongo.collection::<User>("users");
        let mut cursor = users_collection
            .find(doc! { "_id": { "$in": ids } })
            .await
            .context("Failed to query instructors")?;

        let mut map = HashMap::new();
        while let Some(user) = cursor.try_next().await.context("Failed to read instructor")? {
            if let Some(id) = user.id {
                map.insert(id, user);
            }
        }
        Ok(map)
    }
}
