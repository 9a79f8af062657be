use axum::http::StatusCode;
use mongodb::bson::doc;
use serde_json::json;
use serial_test::serial;

mod common;

/// Remove every admin except the given email so last-admin tests are
/// deterministic regardless of what earlier runs left behind
async fn demote_other_admins(mongo: &mongodb::Database, keep_email: &str) {
    mongo
        .collection::<mongodb::bson::Document>("users")
        .update_many(
            doc! { "role": "admin", "email": { "$ne": keep_email } },
            doc! { "$set": { "role": "instructor" } },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_users_routes_require_admin() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    // Unauthenticated -> 401
    let response = ctx
        .app
        .clone()
        .oneshot_get("/api/v1/users")
        .await;
    assert_eq!(response, StatusCode::UNAUTHORIZED);

    // Student -> 403
    let token = common::register_and_token(&ctx.app, "non-admin", None).await;
    let (status, _) =
        common::authed_json_request(&ctx.app, "GET", "/api/v1/users", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_lists_and_reads_users() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let admin_token = common::register_and_token(&ctx.app, "admin-list", Some("admin")).await;
    let student_email = common::unique_email("listed-student");
    let (status, body, _) =
        common::register_user(&ctx.app, &student_email, "Password123!", "Listed", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let student_id = common::extract_user_id(&body).unwrap();

    let (status, response) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/users?search={}", student_email),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", response);
    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    // Password hashes never leave the service
    assert!(json[0].get("password_hash").is_none());

    let (status, response) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/users/{}", student_id.to_hex()),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json["email"], student_email);
}

#[tokio::test]
#[serial]
async fn test_role_change_and_last_admin_protection() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let admin_email = common::unique_email("sole-admin");
    let (status, body, _) =
        common::register_user(&ctx.app, &admin_email, "Password123!", "Admin", Some("admin")).await;
    assert_eq!(status, StatusCode::CREATED);
    let admin_id = common::extract_user_id(&body).unwrap();
    let admin_token = common::extract_access_token(&body).unwrap();

    demote_other_admins(&ctx.mongo, &admin_email).await;

    // Promote a student to instructor: plain role change works
    let student_email = common::unique_email("promote-me");
    let (_, body, _) =
        common::register_user(&ctx.app, &student_email, "Password123!", "Student", None).await;
    let student_id = common::extract_user_id(&body).unwrap();

    let (status, response) = common::authed_json_request(
        &ctx.app,
        "PATCH",
        &format!("/api/v1/users/{}", student_id.to_hex()),
        &admin_token,
        Some(json!({ "role": "instructor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", response);
    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json["role"], "instructor");

    // Demoting the sole remaining admin must be refused
    let (status, response) = common::authed_json_request(
        &ctx.app,
        "PATCH",
        &format!("/api/v1/users/{}", admin_id.to_hex()),
        &admin_token,
        Some(json!({ "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(json["message"], "لا يمكن إزالة آخر مسؤول في النظام");

    // Deleting the sole remaining admin must be refused too
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/users/{}", admin_id.to_hex()),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // With a second admin present, demotion goes through
    let second_admin = common::unique_email("second-admin");
    let (status, _, _) = common::register_user(
        &ctx.app,
        &second_admin,
        "Password123!",
        "Backup Admin",
        Some("admin"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = common::authed_json_request(
        &ctx.app,
        "PATCH",
        &format!("/api/v1/users/{}", admin_id.to_hex()),
        &admin_token,
        Some(json!({ "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", response);
}

#[tokio::test]
#[serial]
async fn test_delete_user_cascades() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let admin_token = common::register_and_token(&ctx.app, "cascade-admin", Some("admin")).await;

    // A student with one enrollment
    let student_email = common::unique_email("cascade-student");
    let (_, body, _) =
        common::register_user(&ctx.app, &student_email, "Password123!", "Student", None).await;
    let student_id = common::extract_user_id(&body).unwrap();
    let student_token = common::extract_access_token(&body).unwrap();

    let (course_id, lesson_ids) =
        common::seed_course_with_lessons(&ctx.mongo, mongodb::bson::oid::ObjectId::new(), 1).await;
    let exercise_id = common::seed_exercise(&ctx.mongo, lesson_ids[0]).await;

    let (status, _) = common::authed_json_request(
        &ctx.app,
        "POST",
        "/api/v1/enrollments",
        &student_token,
        Some(json!({
            "course_id": course_id.to_hex(),
            "exercise_id": exercise_id.to_hex(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = common::authed_json_request(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/users/{}", student_id.to_hex()),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let users = ctx
        .mongo
        .collection::<mongodb::bson::Document>("users")
        .count_documents(doc! { "_id": student_id })
        .await
        .unwrap();
    assert_eq!(users, 0);

    let enrollments = ctx
        .mongo
        .collection::<mongodb::bson::Document>("enrollments")
        .count_documents(doc! { "userId": student_id })
        .await
        .unwrap();
    assert_eq!(enrollments, 0);

    // Deleting an unknown user is a 404
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/users/{}", student_id.to_hex()),
        &admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// Small extension trait to keep the unauthenticated check terse
trait OneshotGet {
    async fn oneshot_get(&self, uri: &str) -> StatusCode;
}

impl OneshotGet for axum::Router {
    async fn oneshot_get(&self, uri: &str) -> StatusCode {
        use axum::{body::Body, http::Request};
        use tower::ServiceExt;

        self.clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }
}
