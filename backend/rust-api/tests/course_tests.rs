use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

mod common;

const BOUNDARY: &str = "------------------------dorati-test-boundary";

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((filename, bytes)) = image {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn post_course(
    app: &axum::Router,
    token: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> (StatusCode, String) {
    let (csrf_token, csrf_cookie) = common::fetch_csrf_token(app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/courses")
                .header("authorization", format!("Bearer {}", token))
                .header("x-csrf-token", &csrf_token)
                .header("cookie", &csrf_cookie)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(fields, image)))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

const COURSE_FIELDS: &[(&str, &str)] = &[
    ("title", "أساسيات البرمجة للأطفال"),
    ("description", "تعلم أساسيات البرمجة بطريقة ممتعة"),
    ("level", "beginner"),
    ("price", "0"),
    ("duration", "60"),
];

#[tokio::test]
async fn test_create_course_as_instructor() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "course-author", Some("instructor")).await;

    let image = [0x89u8, 0x50, 0x4e, 0x47, 0, 0, 0, 0];
    let (status, body) = post_course(
        &ctx.app,
        &token,
        COURSE_FIELDS,
        Some(("cover.png", &image)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["title"], "أساسيات البرمجة للأطفال");
    assert_eq!(json["is_published"], false);
    assert!(json["image_url"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/"));
}

#[tokio::test]
async fn test_create_course_requires_instructor_role() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "course-student", None).await;

    let image = [1u8, 2, 3, 4];
    let (status, _) = post_course(
        &ctx.app,
        &token,
        COURSE_FIELDS,
        Some(("cover.png", &image)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_course_requires_image() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "no-image", Some("instructor")).await;

    let (status, body) = post_course(&ctx.app, &token, COURSE_FIELDS, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "صورة الدورة مطلوبة");
}

#[tokio::test]
async fn test_create_course_validates_fields() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "bad-fields", Some("instructor")).await;

    // Empty title
    let image = [1u8, 2, 3, 4];
    let fields = [
        ("title", ""),
        ("description", "desc"),
        ("level", "beginner"),
        ("price", "0"),
        ("duration", "60"),
    ];
    let (status, _) = post_course(&ctx.app, &token, &fields, Some(("cover.png", &image))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown level
    let fields = [
        ("title", "Course"),
        ("description", "desc"),
        ("level", "expert"),
        ("price", "0"),
        ("duration", "60"),
    ];
    let (status, body) = post_course(&ctx.app, &token, &fields, Some(("cover.png", &image)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "مستوى الدورة غير صالح");
}

#[tokio::test]
async fn test_list_courses_requires_auth() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/courses")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_course_detail_and_delete() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let token = common::register_and_token(&ctx.app, "course-owner", Some("instructor")).await;

    let image = [9u8, 9, 9, 9];
    let (status, body) = post_course(
        &ctx.app,
        &token,
        COURSE_FIELDS,
        Some(("cover.png", &image)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    let course_id = created["id"].as_str().unwrap().to_string();

    // Detail view includes (empty) lesson list
    let (status, body) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/courses/{}", course_id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["id"], course_id);
    assert!(json["lessons"].as_array().unwrap().is_empty());

    // A different instructor cannot delete someone else's course
    let other_token = common::register_and_token(&ctx.app, "other-instructor", Some("instructor")).await;
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/courses/{}", course_id),
        &other_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner can
    let (status, _) = common::authed_json_request(
        &ctx.app,
        "DELETE",
        &format!("/api/v1/courses/{}", course_id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::authed_json_request(
        &ctx.app,
        "GET",
        &format!("/api/v1/courses/{}", course_id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
