use anyhow::{anyhow, Context, Result};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use crate::messages;
use crate::metrics::LESSONS_COMPLETED_TOTAL;
use crate::models::course::Course;
use crate::models::enrollment::Enrollment;
use crate::models::lesson::Lesson;
use crate::models::progress::{
    progress_percent, CourseProgressInfo, CourseProgressResponse, LessonProgress,
    LessonWithCompletion, StudentCourseProgress, StudentProgressReport, UpdateProgressRequest,
    UpdateProgressResponse, UserProgress,
};
use crate::models::user::{User, UserRole};

pub struct ProgressService {
    mongo: Database,
}

impl ProgressService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Mark a lesson complete/incomplete for a user, then recount.
    ///
    /// The upsert is keyed by the composite `_id` "{userId}_{lessonId}" so a
    /// repeated completion updates the same record. The recount that follows
    /// is a separate read; the pair is intentionally not transactional, so a
    /// concurrent completion may observe a momentarily stale count.
    pub async fn update_progress(
        &self,
        user_id: ObjectId,
        course_id: &str,
        req: UpdateProgressRequest,
    ) -> Result<UpdateProgressResponse> {
        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;
        let lesson_oid =
            ObjectId::parse_str(&req.lesson_id).context("Invalid lesson ID format")?;

        let composite_id = UserProgress::composite_id(&user_id, &lesson_oid);

        let progress_collection = self.mongo.collection::<Document>("user_progress");
        progress_collection
            .update_one(
                doc! { "_id": &composite_id },
                doc! {
                    "$set": { "completed": req.completed },
                    "$inc": { "attempts": 1 },
                    "$setOnInsert": {
                        "userId": user_id,
                        "courseId": course_oid,
                        "lessonId": lesson_oid,
                        "score": 0,
                    },
                },
            )
            .upsert(true)
            .await
            .context(messages::PROGRESS_UPDATE_FAILED)?;

        if req.completed {
            LESSONS_COMPLETED_TOTAL
                .with_label_values(&["progress_api"])
                .inc();
        }

        // Recount; not coupled to the upsert above in a transaction
        let total_lessons = self
            .mongo
            .collection::<Lesson>("lessons")
            .count_documents(doc! { "courseId": course_oid })
            .await
            .context("Failed to count lessons")?;

        let completed_lessons = self
            .mongo
            .collection::<UserProgress>("user_progress")
            .count_documents(doc! {
                "userId": user_id,
                "courseId": course_oid,
                "completed": true,
            })
            .await
            .context("Failed to count completed lessons")?;

        Ok(UpdateProgressResponse {
            success: true,
            progress: progress_percent(completed_lessons, total_lessons),
            completed_lessons,
        })
    }

    /// Read a user's progress through a course; the percentage is always
    /// recomputed from completed/total counts
    pub async fn course_progress(
        &self,
        user_id: ObjectId,
        course_id: &str,
    ) -> Result<CourseProgressResponse> {
        let course_oid = ObjectId::parse_str(course_id).context("Invalid course ID format")?;

        let course = self
            .mongo
            .collection::<Course>("courses")
            .find_one(doc! { "_id": course_oid })
            .await
            .context("Failed to query course")?
            .ok_or_else(|| anyhow!(messages::COURSE_NOT_FOUND))?;

        let lessons = self.load_lessons(&course_oid).await?;

        let mut cursor = self
            .mongo
            .collection::<UserProgress>("user_progress")
            .find(doc! { "userId": user_id, "courseId": course_oid })
            .await
            .context(messages::PROGRESS_FETCH_FAILED)?;

        let mut completed_ids = Vec::new();
        while let Some(progress) = cursor.try_next().await.context("Failed to read progress")? {
            if progress.completed {
                completed_ids.push(progress.lesson_id);
            }
        }

        let progress = progress_percent(completed_ids.len() as u64, lessons.len() as u64);

        let lesson_rows = lessons
            .into_iter()
            .map(|lesson| {
                let id = lesson.id.map(|id| id.to_hex()).unwrap_or_default();
                let completed = lesson
                    .id
                    .map(|oid| completed_ids.contains(&oid))
                    .unwrap_or(false);
                LessonWithCompletion {
                    id,
                    title: lesson.title,
                    duration: lesson.duration,
                    completed,
                }
            })
            .collect();

        Ok(CourseProgressResponse {
            course_id: course_oid.to_hex(),
            progress,
            completed_lessons: completed_ids.iter().map(|id| id.to_hex()).collect(),
            course: CourseProgressInfo {
                id: course_oid.to_hex(),
                title: course.title,
                description: course.description,
                lessons: lesson_rows,
            },
        })
    }

    /// Progress overview for dashboards.
    ///
    /// Parents see their linked children; instructors see students enrolled
    /// in their own courses. Any other role is rejected by the handler.
    pub async fn overview(
        &self,
        caller_id: ObjectId,
        caller_role: UserRole,
    ) -> Result<Vec<StudentProgressReport>> {
        let students = match caller_role {
            UserRole::Parent => self.load_children(&caller_id).await?,
            UserRole::Instructor => self.load_enrolled_students(&caller_id).await?,
            _ => return Err(anyhow!(messages::FORBIDDEN)),
        };

        let course_filter = if caller_role == UserRole::Instructor {
            Some(self.load_course_ids(&caller_id).await?)
        } else {
            None
        };

        let mut reports = Vec::new();
        for student in students {
            let Some(student_id) = student.id else {
                continue;
            };

            let mut filter = doc! { "userId": student_id };
            if let Some(course_ids) = &course_filter {
                filter.insert("courseId", doc! { "$in": course_ids });
            }

            let mut cursor = self
                .mongo
                .collection::<Enrollment>("enrollments")
                .find(filter)
                .await
                .context("Failed to query enrollments")?;

            let mut courses = Vec::new();
            while let Some(enrollment) =
                cursor.try_next().await.context("Failed to read enrollment")?
            {
                if let Some(entry) = self.course_progress_entry(&enrollment).await? {
                    courses.push(entry);
                }
            }

            reports.push(StudentProgressReport {
                id: student_id.to_hex(),
                name: student.name,
                courses,
            });
        }

        Ok(reports)
    }

    async fn course_progress_entry(
        &self,
        enrollment: &Enrollment,
    ) -> Result<Option<StudentCourseProgress>> {
        let Some(course) = self
            .mongo
            .collection::<Course>("courses")
            .find_one(doc! { "_id": enrollment.course_id })
            .await
            .context("Failed to query course")?
        else {
            return Ok(None);
        };

        let total_lessons = self
            .mongo
            .collection::<Lesson>("lessons")
            .count_documents(doc! { "courseId": enrollment.course_id })
            .await
            .context("Failed to count lessons")?;

        let completed_lessons = match enrollment.id {
            Some(enrollment_id) => self
                .mongo
                .collection::<LessonProgress>("lesson_progress")
                .count_documents(doc! { "enrollmentId": enrollment_id, "completed": true })
                .await
                .context("Failed to count lesson progress")?,
            None => 0,
        };

        Ok(Some(StudentCourseProgress {
            course_id: enrollment.course_id.to_hex(),
            title: course.title,
            progress: progress_percent(completed_lessons, total_lessons),
            completed_lessons: completed_lessons as i64,
            total_lessons: total_lessons as i64,
        }))
    }

    async fn load_children(&self, parent_id: &ObjectId) -> Result<Vec<User>> {
        let mut cursor = self
            .mongo
            .collection::<User>("users")
            .find(doc! { "parentId": parent_id })
            .await
            .context("Failed to query children")?;

        let mut children = Vec::new();
        while let Some(child) = cursor.try_next().await.context("Failed to read child")? {
            children.push(child);
        }
        Ok(children)
    }

    async fn load_course_ids(&self, instructor_id: &ObjectId) -> Result<Vec<ObjectId>> {
        let mut cursor = self
            .mongo
            .collection::<Course>("courses")
            .find(doc! { "instructorId": instructor_id })
            .await
            .context("Failed to query courses")?;

        let mut ids = Vec::new();
        while let Some(course) = cursor.try_next().await.context("Failed to read course")? {
            if let Some(id) = course.id {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn load_enrolled_students(&self, instructor_id: &ObjectId) -> Result<Vec<User>> {
        let course_ids = self.load_course_ids(instructor_id).await?;
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cursor = self
            .mongo
            .collection::<Enrollment>("enrollments")
            .find(doc! { "courseId": { "$in": &course_ids } })
            .await
            .context("Failed to query enrollments")?;

        let mut student_ids = Vec::new();
        while let Some(enrollment) = cursor.try_next().await.context("Failed to read enrollment")? {
            if !student_ids.contains(&enrollment.user_id) {
                student_ids.push(enrollment.user_id);
            }
        }

        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cursor = self
            .mongo
            .collection::<User>("users")
            .find(doc! { "_id": { "$in": &student_ids } })
            .await
            .context("Failed to query students")?;

        let mut students = Vec::new();
        while let Some(student) = cursor.try_next().await.context("Failed to read student")? {
            students.push(student);
        }
        Ok(students)
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
}
