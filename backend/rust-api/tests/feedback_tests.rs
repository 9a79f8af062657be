use axum::http::StatusCode;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_feedback_role_gating_and_visibility() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let (course_id, _) = common::seed_course_with_lessons(&ctx.mongo, ObjectId::new(), 1).await;

    let instructor_token =
        common::register_and_token(&ctx.app, "feedback-author", Some("instructor")).await;

    let student_email = common::unique_email("feedback-student");
    let (_, body, _) =
        common::register_user(&ctx.app, &student_email, "Password123!", "Student", None).await;
    let student_id = common::extract_user_id(&body).unwrap();
    let student_token = common::extract_access_token(&body).unwrap();

    let feedback_body = json!({
        "content": "أحسنت! تقدم ممتاز في الدروس",
        "course_id": course_id.to_hex(),
        "receiver_id": student_id.to_hex(),
    });

    // Students cannot leave feedback
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/feedback",
        &student_token,
        Some(feedback_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Instructors can
    let (status, body) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/feedback",
        &instructor_token,
        Some(feedback_body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(created["provider"]["role"], "instructor");
    assert_eq!(created["receiver"]["name"], "Student");

    // The receiver sees it in their list, filtered by course
    let (status, body) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/feedback?course_id={}", course_id.to_hex()),
        &student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let listed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["content"], "أحسنت! تقدم ممتاز في الدروس");

    // An unrelated user sees nothing
    let other_token = common::register_and_token(&ctx.app, "feedback-outsider", None).await;
    let (status, body) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/feedback?course_id={}", course_id.to_hex()),
        &other_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_exercise_creation_gated_and_listed() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let (_, lesson_ids) = common::seed_course_with_lessons(&ctx.mongo, ObjectId::new(), 1).await;

    let student_token = common::register_and_token(&ctx.app, "exercise-student", None).await;
    let instructor_token =
        common::register_and_token(&ctx.app, "exercise-author", Some("instructor")).await;

    let exercise_body = json!({
        "title": "Advanced Drag and Drop",
        "title_ar": "السحب والإفلات المتقدم",
        "type": "drag_and_drop",
        "lesson_id": lesson_ids[0].to_hex(),
        "content": {
            "blocks": [
                { "id": "1", "code": "class Car {}", "type": "class" },
            ],
            "categories": ["class"],
        },
    });

    let (status, _) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/exercises",
        &student_token,
        Some(exercise_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/exercises",
        &instructor_token,
        Some(exercise_body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    // The content blob is stored and served verbatim
    assert_eq!(created["content"]["categories"][0], "class");

    // Creating against a missing lesson is a 404
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/exercises",
        &instructor_token,
        Some(json!({
            "title": "Orphan",
            "type": "quiz",
            "lesson_id": ObjectId::new().to_hex(),
            "content": {},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Filter by lesson
    let (status, body) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/exercises?lesson_id={}", lesson_ids[0].to_hex()),
        &student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let listed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(!listed.as_array().unwrap().is_empty());
}
