use axum::http::StatusCode;
use mongodb::bson::oid::ObjectId;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_progress_zero_lessons_is_zero() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let (course_id, _) = common::seed_course_with_lessons(&ctx.mongo, ObjectId::new(), 0).await;
    let token = common::register_and_token(&ctx.app, "zero-lessons", None).await;

    let uri = format!("/api/v1/courses/{}/progress", course_id.to_hex());
    let (status, response) =
        common::authed_json_request(&ctx.app, "GET", &uri, &token, None).await;
    assert_eq!(status, StatusCode::OK, "body: {}", response);

    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    // No division error, just zero
    assert_eq!(json["progress"], 0);
    assert_eq!(json["completed_lessons"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_progress_half_completed_course() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    // Course with 4 lessons; completing lessons 1-2 must read back 50
    let (course_id, lesson_ids) =
        common::seed_course_with_lessons(&ctx.mongo, ObjectId::new(), 4).await;
    let token = common::register_and_token(&ctx.app, "half-progress", None).await;

    let uri = format!("/api/v1/courses/{}/progress", course_id.to_hex());

    for lesson_id in lesson_ids.iter().take(2) {
        let (status, response) = common::authed_json_request(
            &ctx.app,
            "POST",
            &uri,
            &token,
            Some(json!({ "lesson_id": lesson_id.to_hex(), "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "body: {}", response);
    }

    let (status, response) =
        common::authed_json_request(&ctx.app, "GET", &uri, &token, None).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json["progress"], 50);
    assert_eq!(json["completed_lessons"].as_array().unwrap().len(), 2);

    let lessons = json["course"]["lessons"].as_array().unwrap();
    assert_eq!(lessons.len(), 4);
    assert_eq!(lessons[0]["completed"], true);
    assert_eq!(lessons[1]["completed"], true);
    assert_eq!(lessons[2]["completed"], false);
    assert_eq!(lessons[3]["completed"], false);
}

#[tokio::test]
async fn test_marking_complete_twice_is_idempotent() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let (course_id, lesson_ids) =
        common::seed_course_with_lessons(&ctx.mongo, ObjectId::new(), 2).await;
    let token = common::register_and_token(&ctx.app, "idempotent", None).await;

    let uri = format!("/api/v1/courses/{}/progress", course_id.to_hex());
    let body = json!({ "lesson_id": lesson_ids[0].to_hex(), "completed": true });

    let (status, first) =
        common::authed_json_request(&ctx.app, "POST", &uri, &token, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK, "body: {}", first);

    let (status, second) =
        common::authed_json_request(&ctx.app, "POST", &uri, &token, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", second);

    // Same single completed lesson both times: one record, not two
    let first: serde_json::Value = serde_json::from_str(&first).unwrap();
    let second: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert_eq!(first["completed_lessons"], 1);
    assert_eq!(second["completed_lessons"], 1);
    assert_eq!(first["progress"], 50);
    assert_eq!(second["progress"], 50);
}

#[tokio::test]
async fn test_progress_unknown_course_is_404() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "missing-course", None).await;

    let uri = format!("/api/v1/courses/{}/progress", ObjectId::new().to_hex());
    let (status, response) =
        common::authed_json_request(&ctx.app, "GET", &uri, &token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json["message"], "الدورة غير موجودة");
}

#[tokio::test]
async fn test_overview_forbidden_for_students() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "student-overview", None).await;
    let (status, _) =
        common::authed_json_request(&ctx.app, "GET", "/api/v1/progress", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let parent_token = common::register_and_token(&ctx.app, "parent-overview", Some("parent")).await;
    let (status, response) =
        common::authed_json_request(&ctx.app, "GET", "/api/v1/progress", &parent_token, None).await;
    assert_eq!(status, StatusCode::OK, "body: {}", response);
}

#[tokio::test]
async fn test_exercise_attempt_completes_lesson() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let (course_id, lesson_ids) =
        common::seed_course_with_lessons(&ctx.mongo, ObjectId::new(), 2).await;
    let exercise_id = common::seed_exercise(&ctx.mongo, lesson_ids[0]).await;

    let token = common::register_and_token(&ctx.app, "attempt", None).await;

    // Enroll first so the attempt can attach to an enrollment
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/enrollments",
        &token,
        Some(json!({
            "course_id": course_id.to_hex(),
            "exercise_id": exercise_id.to_hex(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = common::authed_json_request(
        &ctx.app,
        "PUT",
        "/api/v1/exercises",
        &token,
        Some(json!({
            "exercise_id": exercise_id.to_hex(),
            "score": 90,
            "answers": { "1": "variable", "2": "function" },
            "time_spent": 120,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", response);

    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json["score"], 90);

    // The enrollment's lesson progress was upserted as completed
    let (status, response) =
        common::authed_json_request(&ctx.app, "GET", "/api/v1/enrollments", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    let entry = json
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == course_id.to_hex())
        .unwrap()
        .clone();
    assert_eq!(entry["progress"], 50);
}
