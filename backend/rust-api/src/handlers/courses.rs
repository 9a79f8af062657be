use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use validator::Validate;

use crate::{
    messages,
    middlewares::auth::JwtClaims,
    models::course::{CourseFields, CourseLevel, ListCoursesQuery},
    models::user::UserRole,
    services::{
        audit_service::AuditService, course_service::CourseService,
        upload_service::UploadService, AppState,
    },
};

use super::{ensure_role, validation_error, ApiError};

fn caller_role(claims: &JwtClaims) -> UserRole {
    match claims.role.as_str() {
        "instructor" => UserRole::Instructor,
        "admin" => UserRole::Admin,
        "parent" => UserRole::Parent,
        _ => UserRole::Student,
    }
}

/// POST /api/v1/courses - Create a course (instructor/admin, multipart form)
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(&claims, &[UserRole::Instructor, UserRole::Admin])?;

    let mut fields = CourseFields::default();
    let mut level_raw: Option<String> = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        match name.as_str() {
            "title" => {
                fields.title = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?;
            }
            "description" => {
                fields.description = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?;
            }
            "level" => {
                level_raw = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?,
                );
            }
            "price" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?;
                fields.price = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?;
            }
            "duration" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?;
                fields.duration = raw
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| ApiError::bad_request(messages::MISSING_FIELDS))?;
            }
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid image upload: {}", e)))?;
                image = Some((file_name, data.to_vec()));
            }
            _ => {
                // Unknown fields in the form are ignored
            }
        }
    }

    let Some((image_name, image_bytes)) = image else {
        return Err(ApiError::bad_request(messages::IMAGE_REQUIRED));
    };

    let level = level_raw
        .as_deref()
        .and_then(CourseLevel::parse)
        .ok_or_else(|| ApiError::bad_request(messages::INVALID_LEVEL))?;

    if let Err(e) = fields.validate() {
        return Err(validation_error(&e));
    }

    let instructor_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let upload_service = UploadService::new(&state.config.upload_dir);
    let image_url = upload_service
        .store_image(&image_name, image_bytes)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store course image: {:#}", e);
            ApiError::internal(messages::COURSE_CREATE_FAILED)
        })?;

    let course_service = CourseService::new(state.mongo.clone());
    let course = match course_service
        .create_course(fields, level, instructor_id, image_url.clone())
        .await
    {
        Ok(course) => course,
        Err(e) => {
            // Course insert failed after the image landed on disk
            let _ = upload_service.remove_image(&image_url).await;
            return Err(ApiError::from_service(e));
        }
    };

    let audit_service = AuditService::new(state.mongo.clone());
    let _ = audit_service
        .log_course_create(&claims.sub, &course.id)
        .await;

    tracing::info!("Course created: {} by {}", course.id, claims.sub);

    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /api/v1/courses - List courses (instructors see only their own)
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<ListCoursesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let course_service = CourseService::new(state.mongo.clone());

    let courses = course_service
        .list_courses(query, &claims.sub, caller_role(&claims))
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(courses))
}

/// GET /api/v1/courses/{id} - Course detail with ordered lessons
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let course_service = CourseService::new(state.mongo.clone());

    let course = course_service
        .get_course(&course_id)
        .await
        .map_err(ApiError::from_service)?;

    Ok(Json(course))
}

/// DELETE /api/v1/courses/{id} - Delete a course (owner instructor or admin)
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_role(&claims, &[UserRole::Instructor, UserRole::Admin])?;

    let course_service = CourseService::new(state.mongo.clone());
    let image_url = course_service
        .delete_course(&course_id, &claims.sub, caller_role(&claims))
        .await
        .map_err(ApiError::from_service)?;

    // Remove the stored image; a leftover file is not worth failing over
    if let Some(image_url) = image_url {
        let upload_service = UploadService::new(&state.config.upload_dir);
        if let Err(e) = upload_service.remove_image(&image_url).await {
            tracing::warn!("Failed to remove course image {}: {:#}", image_url, e);
        }
    }

    let audit_service = AuditService::new(state.mongo.clone());
    let _ = audit_service
        .log_course_delete(&claims.sub, &course_id)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
