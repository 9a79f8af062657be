#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use mongodb::bson::{doc, oid::ObjectId};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use dorati_api::{config::Config, create_router, services::AppState};

pub struct TestContext {
    pub app: Router,
    pub mongo: mongodb::Database,
}

/// Build the full router against the databases configured in `.env.test`.
///
/// Returns `None` (and the test is skipped) when no test MongoDB is
/// configured, so the suite stays runnable on machines without local
/// MongoDB/Redis instances.
pub async fn create_test_app() -> Option<TestContext> {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    // Load test environment from .env.test
    std::env::set_var("SKIP_ROOT_ENV", "1");
    dotenvy::from_filename(".env.test").ok();

    if std::env::var("MONGO_URI").is_err() {
        eprintln!("Skipping integration test: MONGO_URI is not set (see .env.test.example)");
        return None;
    }

    let config = Config::load().expect("Failed to load test configuration");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");

    let app_state = Arc::new(
        AppState::new(config.clone(), mongo_client.clone(), redis_client)
            .await
            .expect("Failed to initialize test app state"),
    );

    let mongo = mongo_client.database(&config.mongo_database);

    Some(TestContext {
        app: create_router(app_state),
        mongo,
    })
}

/// Unique email per test run to keep reruns independent
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, ObjectId::new().to_hex())
}

/// Register a user and return (status, body, cookies)
pub async fn register_user(
    app: &Router,
    email: &str,
    password: &str,
    name: &str,
    role: Option<&str>,
) -> (StatusCode, String, Vec<String>) {
    let mut request_body = json!({
        "email": email,
        "password": password,
        "name": name,
        "age": 10,
    });
    if let Some(role) = role {
        request_body["role"] = json!(role);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(|s| s.to_string()))
        .collect();

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();

    (status, body_str, cookies)
}

/// Login and return (status, body, cookies)
pub async fn login_user(
    app: &Router,
    email: &str,
    password: &str,
) -> (StatusCode, String, Vec<String>) {
    let request_body = json!({
        "email": email,
        "password": password,
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(|s| s.to_string()))
        .collect();

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();

    (status, body_str, cookies)
}

/// Register a fresh user and return their access token
pub async fn register_and_token(app: &Router, prefix: &str, role: Option<&str>) -> String {
    let email = unique_email(prefix);
    let (status, body, _) = register_user(app, &email, "Password123!", "Test User", role).await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    extract_access_token(&body).expect("access_token missing in registration response")
}

/// Extract access_token from JSON response
pub fn extract_access_token(json_str: &str) -> Option<String> {
    let value: Value = serde_json::from_str(json_str).ok()?;
    value["access_token"].as_str().map(|s| s.to_string())
}

/// Fetch a CSRF token; returns (token, cookie pair "csrf_token=...")
pub async fn fetch_csrf_token(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/auth/csrf-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let csrf_cookie = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("csrf_token="))
        .and_then(|header| header.split(';').next())
        .map(|pair| pair.to_string())
        .unwrap_or_default();

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();
    let json: Value = serde_json::from_str(&body_str).unwrap();
    let csrf_token = json["csrf_token"].as_str().unwrap().to_string();

    (csrf_token, csrf_cookie)
}

/// Send an authenticated JSON request through the router, carrying the
/// CSRF token in both header and cookie
pub async fn authed_json_request(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, String) {
    let (csrf_token, csrf_cookie) = fetch_csrf_token(app).await;

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("x-csrf-token", &csrf_token)
        .header("cookie", &csrf_cookie);

    let request = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(body.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();

    (status, body_str)
}

/// Seed a course with `lesson_count` ordered lessons directly in MongoDB.
/// Lessons have no public write endpoint, matching the production surface.
pub async fn seed_course_with_lessons(
    mongo: &mongodb::Database,
    instructor_id: ObjectId,
    lesson_count: usize,
) -> (ObjectId, Vec<ObjectId>) {
    let now = mongodb::bson::DateTime::now();

    let courses = mongo.collection::<mongodb::bson::Document>("courses");
    let course_id = courses
        .insert_one(doc! {
            "title": "أساسيات البرمجة للأطفال",
            "description": "تعلم أساسيات البرمجة بطريقة ممتعة وسهلة",
            "level": "beginner",
            "price": 0.0,
            "duration": 60,
            "instructorId": instructor_id,
            "isPublished": true,
            "createdAt": now,
            "updatedAt": now,
        })
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap();

    let lessons = mongo.collection::<mongodb::bson::Document>("lessons");
    let mut lesson_ids = Vec::new();
    for order in 0..lesson_count {
        let lesson_id = lessons
            .insert_one(doc! {
                "courseId": course_id,
                "title": format!("Lesson {}", order + 1),
                "titleAr": format!("الدرس {}", order + 1),
                "content": "Learn the basics of drag and drop programming",
                "contentAr": "تعلم أساسيات البرمجة باستخدام السحب والإفلات",
                "duration": 30,
                "order": (order + 1) as i32,
                "isPublished": true,
            })
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap();
        lesson_ids.push(lesson_id);
    }

    (course_id, lesson_ids)
}

/// Seed a drag-and-drop exercise for a lesson
pub async fn seed_exercise(mongo: &mongodb::Database, lesson_id: ObjectId) -> ObjectId {
    let exercises = mongo.collection::<mongodb::bson::Document>("exercises");
    exercises
        .insert_one(doc! {
            "lessonId": lesson_id,
            "title": "Drag and Drop Basics",
            "titleAr": "أساسيات السحب والإفلات",
            "type": "drag_and_drop",
            "content": {
                "blocks": [
                    { "id": "1", "code": "let score = 10", "type": "variable" },
                    { "id": "2", "code": "function jump() {}", "type": "function" },
                ],
                "categories": ["variable", "function"],
            },
        })
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap()
}

/// Extract the caller's user id from a registration/login response body
pub fn extract_user_id(json_str: &str) -> Option<ObjectId> {
    let value: Value = serde_json::from_str(json_str).ok()?;
    value["user"]["id"]
        .as_str()
        .and_then(|s| ObjectId::parse_str(s).ok())
}
