use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;

use crate::messages;
use crate::metrics;
use crate::middlewares::auth::JwtClaims;
use crate::models::user::UserRole;
use crate::services::AppState;

/// JSON error envelope shared by all resource handlers:
/// `{"message": ..., "status": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    TooManyRequests(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Translate a service error into the HTTP envelope by matching the
    /// localized message constants services raise
    pub fn from_service(err: anyhow::Error) -> Self {
        let message = err.to_string();
        match message.as_str() {
            m if m == messages::USER_NOT_FOUND
                || m == messages::COURSE_NOT_FOUND
                || m == messages::LESSON_NOT_FOUND
                || m == messages::EXERCISE_NOT_FOUND
                || m == messages::QUIZ_NOT_FOUND =>
            {
                ApiError::NotFound(message)
            }
            m if m == messages::FORBIDDEN => ApiError::Forbidden(message),
            m if m == messages::EMAIL_TAKEN
                || m == messages::ALREADY_ENROLLED
                || m == messages::LAST_ADMIN_PROTECTED
                || m == messages::INVALID_CREDENTIALS
                || m.starts_with("Invalid") =>
            {
                ApiError::BadRequest(message)
            }
            _ => {
                tracing::error!("Internal service error: {:#}", err);
                ApiError::Internal(messages::INTERNAL_ERROR.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::from_service(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::TooManyRequests(message) => (StatusCode::TOO_MANY_REQUESTS, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let json_response = json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}

/// Reject callers whose role is not in the allowed set
pub fn ensure_role(claims: &JwtClaims, allowed: &[UserRole]) -> Result<(), ApiError> {
    if allowed.iter().any(|role| claims.has_role(*role)) {
        Ok(())
    } else {
        Err(ApiError::forbidden(messages::FORBIDDEN))
    }
}

/// Turn a validator error into a 400 carrying the first field message,
/// which is already localized on the request DTOs
pub fn validation_error(errors: &validator::ValidationErrors) -> ApiError {
    let first_message = errors
        .field_errors()
        .into_values()
        .flatten()
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()));

    ApiError::BadRequest(first_message.unwrap_or_else(|| messages::MISSING_FIELDS.to_string()))
}

/// Extract client IP and User-Agent for audit logging
pub fn client_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    (ip, user_agent)
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut status = "healthy";
    let mut dependencies = serde_json::Map::new();
    let mut all_healthy = true;

    // Check MongoDB
    let mongo_health = check_mongodb(&state).await;
    dependencies.insert("mongodb".to_string(), json!(mongo_health));
    if mongo_health.get("status").and_then(|v| v.as_str()) != Some("healthy") {
        all_healthy = false;
        status = "degraded";
    }

    // Check Redis
    let redis_health = check_redis(&state).await;
    dependencies.insert("redis".to_string(), json!(redis_health));
    if redis_health.get("status").and_then(|v| v.as_str()) != Some("healthy") {
        all_healthy = false;
        status = "degraded";
    }

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "dorati-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

async fn check_mongodb(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();

    match tokio::time::timeout(
        std::time::Duration::from_secs(1),
        state.mongo.run_command(mongodb::bson::doc! { "ping": 1 }),
    )
    .await
    {
        Ok(Ok(_)) => {
            result.insert("status".to_string(), json!("healthy"));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("MongoDB error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("MongoDB timeout after 1s"));
        }
    }

    result
}

async fn check_redis(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();

    let mut conn = state.redis.clone();
    match tokio::time::timeout(
        std::time::Duration::from_millis(500),
        redis::cmd("PING").query_async::<String>(&mut conn),
    )
    .await
    {
        Ok(Ok(_)) => {
            result.insert("status".to_string(), json!("healthy"));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("Redis error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("Redis timeout after 500ms"));
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// Metrics authentication middleware - protects /metrics endpoint with HTTP Basic Auth
pub async fn metrics_auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth_header.starts_with("Basic ") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Decode base64 credentials
    let encoded = &auth_header[6..];
    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    // Expected credentials from environment variable, format: username:password
    let expected = std::env::var("METRICS_AUTH").unwrap_or_else(|_| "admin:changeme".to_string());

    if credentials != expected {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

pub mod admin;
pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod exercises;
pub mod feedback;
pub mod progress;
pub mod quizzes;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn claims_with_role(role: &str) -> JwtClaims {
        JwtClaims {
            sub: "65f1a2b3c4d5e6f7a8b9c0d1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            iat: chrono::Utc::now().timestamp() as usize,
        }
    }

    #[test]
    fn test_ensure_role_allows_listed_roles() {
        let claims = claims_with_role("instructor");
        assert!(ensure_role(&claims, &[UserRole::Instructor, UserRole::Admin]).is_ok());
        assert!(ensure_role(&claims, &[UserRole::Admin]).is_err());
    }

    #[test]
    fn test_from_service_maps_not_found() {
        let err = ApiError::from_service(anyhow!(messages::COURSE_NOT_FOUND));
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_from_service_maps_conflicts_to_bad_request() {
        for msg in [
            messages::EMAIL_TAKEN,
            messages::ALREADY_ENROLLED,
            messages::LAST_ADMIN_PROTECTED,
        ] {
            let err = ApiError::from_service(anyhow!(msg));
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
    }

    #[test]
    fn test_from_service_hides_internal_detail() {
        let err = ApiError::from_service(anyhow!("connection pool exhausted"));
        match err {
            ApiError::Internal(message) => assert_eq!(message, messages::INTERNAL_ERROR),
            other => panic!("expected internal error, got {:?}", other),
        }
    }
}
