use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_register_success() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let email = common::unique_email("register");
    let (status, body, cookies) =
        common::register_user(&ctx.app, &email, "SecurePassword123!", "Test Student", None).await;

    assert_eq!(status, StatusCode::CREATED, "body: {}", body);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(json["access_token"].is_string());
    assert_eq!(json["user"]["email"], email);
    assert_eq!(json["user"]["name"], "Test Student");
    assert_eq!(json["user"]["role"], "student"); // Default role

    // Refresh token travels in an HTTP-only cookie scoped to the auth routes
    let refresh_cookie = cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .expect("refresh_token cookie not found");
    assert!(refresh_cookie.contains("HttpOnly"));
    assert!(refresh_cookie.contains("Path=/api/v1/auth"));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let email = common::unique_email("duplicate");

    let (status, _, _) =
        common::register_user(&ctx.app, &email, "Password123!", "User 1", None).await;
    assert_eq!(status, StatusCode::CREATED);

    // Second registration with same email must conflict, never a second account
    let (status, body, _) =
        common::register_user(&ctx.app, &email, "Password456!", "User 2", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "البريد الإلكتروني مستخدم بالفعل");

    let count = ctx
        .mongo
        .collection::<mongodb::bson::Document>("users")
        .count_documents(mongodb::bson::doc! { "email": &email })
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_register_validation_errors() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    // Password too short
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "email": common::unique_email("short-pass"),
                        "password": "123",
                        "name": "Kid",
                        "age": 10,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Age below the platform minimum
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "email": common::unique_email("too-young"),
                        "password": "Password123!",
                        "name": "Kid",
                        "age": 5,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_success_and_wrong_password() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let email = common::unique_email("login");
    let (status, _, _) =
        common::register_user(&ctx.app, &email, "Password123!", "Login User", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body, _) = common::login_user(&ctx.app, &email, "Password123!").await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert!(common::extract_access_token(&body).is_some());

    // Wrong password: generic localized message, no user enumeration
    let (status, body, _) = common::login_user(&ctx.app, &email, "WrongPassword!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "البريد الإلكتروني أو كلمة المرور غير صحيحة");

    // Unknown email: identical message
    let (status, body, _) =
        common::login_user(&ctx.app, &common::unique_email("ghost"), "Password123!").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "البريد الإلكتروني أو كلمة المرور غير صحيحة");
}

#[tokio::test]
async fn test_me_requires_token() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = common::register_and_token(&ctx.app, "me", None).await;
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/auth/me")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["role"], "student");
}

#[tokio::test]
async fn test_refresh_token_flow() {
    let Some(ctx) = common::create_test_app().await else {
        return;
    };

    let email = common::unique_email("refresh");
    let (status, _, cookies) =
        common::register_user(&ctx.app, &email, "Password123!", "Refresh User", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let refresh_cookie = cookies
        .iter()
        .find(|c| c.starts_with("refresh_token="))
        .and_then(|c| c.split(';').next())
        .unwrap()
        .to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .header("cookie", &refresh_cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["access_token"].is_string());
}
