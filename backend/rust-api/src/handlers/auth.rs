use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::sync::Arc;
use validator::Validate;

use crate::{
    extractors::AppJson,
    messages,
    middlewares::auth::{JwtClaims, JwtService},
    models::{
        refresh_token::RefreshTokenResponse,
        user::{
            AuthResponseCookie, ChangePasswordRequest, LoginRequest, RegisterRequest, UserProfile,
        },
    },
    services::{audit_service::AuditService, auth_service::AuthService, AppState},
};

use super::{client_meta, validation_error, ApiError};

fn refresh_cookie(state: &AppState, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build(("refresh_token", value))
        .path("/api/v1/auth")
        .http_only(true)
        .secure(state.config.cookie.secure)
        .same_site(state.config.cookie.parse_same_site())
        .max_age(max_age)
        .build()
}

/// POST /api/v1/auth/register - Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    tracing::info!("Registering new user: {}", req.email);

    let (ip, user_agent) = client_meta(&headers);
    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.mongo.clone(), state.redis.clone(), jwt_service);
    let audit_service = AuditService::new(state.mongo.clone());

    // Save email for audit logging
    let email = req.email.clone();

    match service.register(req).await {
        Ok(response) => {
            tracing::info!("User registered successfully");

            let _ = audit_service
                .log_register_success(&response.user.id, &response.user.email, ip, user_agent)
                .await;

            // Set refresh_token as HTTP-only cookie
            let cookie = refresh_cookie(
                &state,
                response.refresh_token.clone(),
                time::Duration::days(30),
            );
            let jar = jar.add(cookie);

            let response_body = AuthResponseCookie {
                access_token: response.access_token,
                message: messages::REGISTER_SUCCESS.to_string(),
                user: response.user,
            };

            Ok((StatusCode::CREATED, jar, Json(response_body)))
        }
        Err(e) => {
            tracing::warn!("Failed to register user: {}", e);

            let _ = audit_service
                .log_register_failed(&email, None, None, &e.to_string())
                .await;

            Err(ApiError::from_service(e))
        }
    }
}

/// POST /api/v1/auth/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    let (ip, user_agent) = client_meta(&headers);

    tracing::info!("Login attempt for user: {}", req.email);

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.mongo.clone(), state.redis.clone(), jwt_service);
    let audit_service = AuditService::new(state.mongo.clone());

    let email = req.email.clone();
    let remember_me = req.remember_me;

    // Check if account is locked due to failed login attempts.
    // Default to unlocked if the Redis check fails.
    let is_locked = service.check_failed_attempts(&email).await.unwrap_or(false);

    if is_locked {
        tracing::warn!("Login blocked for {}: too many failed attempts", email);
        let _ = audit_service
            .log_login_failed(&email, ip, user_agent, "Account temporarily locked")
            .await;
        return Err(ApiError::TooManyRequests(
            messages::TOO_MANY_ATTEMPTS.to_string(),
        ));
    }

    match service.login(req, ip.clone(), user_agent.clone()).await {
        Ok(response) => {
            tracing::info!("User logged in successfully");

            // Clear failed login attempts on successful login
            let _ = service.clear_failed_attempts(&email).await;

            let _ = audit_service
                .log_login_success(&response.user.id, &response.user.email, ip, user_agent)
                .await;

            let max_age = if remember_me {
                time::Duration::days(30)
            } else {
                time::Duration::days(1)
            };
            let jar = jar.add(refresh_cookie(
                &state,
                response.refresh_token.clone(),
                max_age,
            ));

            let response_body = AuthResponseCookie {
                access_token: response.access_token,
                message: String::new(),
                user: response.user,
            };

            Ok((StatusCode::OK, jar, Json(response_body)))
        }
        Err(e) => {
            tracing::warn!("Failed login: {}", e);

            let count = service.increment_failed_attempts(&email).await.unwrap_or(0);
            tracing::warn!("Failed login attempts for {}: {}/5", email, count);

            let _ = audit_service
                .log_login_failed(&email, ip, user_agent, &e.to_string())
                .await;

            Err(ApiError::Unauthorized(
                messages::INVALID_CREDENTIALS.to_string(),
            ))
        }
    }
}

/// POST /api/v1/auth/refresh - Refresh access token
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Refreshing access token");

    let refresh_token = jar
        .get("refresh_token")
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized(messages::UNAUTHORIZED.to_string()))?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.mongo.clone(), state.redis.clone(), jwt_service);

    match service.refresh_token(&refresh_token).await {
        Ok(access_token) => {
            tracing::debug!("Access token refreshed successfully");
            Ok((StatusCode::OK, Json(RefreshTokenResponse { access_token })))
        }
        Err(e) => {
            tracing::warn!("Failed to refresh token: {}", e);
            Err(ApiError::Unauthorized(messages::UNAUTHORIZED.to_string()))
        }
    }
}

/// POST /api/v1/auth/logout - Logout (revoke refresh token)
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Logging out user");

    let refresh_token = jar
        .get("refresh_token")
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized(messages::UNAUTHORIZED.to_string()))?;

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.mongo.clone(), state.redis.clone(), jwt_service);
    let audit_service = AuditService::new(state.mongo.clone());

    match service.logout(&refresh_token).await {
        Ok(user_id) => {
            tracing::info!("User logged out successfully");

            let _ = audit_service.log_logout(&user_id, None, None).await;

            // Clear the refresh_token cookie
            let jar = jar.add(refresh_cookie(
                &state,
                String::new(),
                time::Duration::ZERO,
            ));

            Ok((StatusCode::NO_CONTENT, jar))
        }
        Err(e) => {
            tracing::error!("Failed to logout: {}", e);
            Err(ApiError::internal(messages::INTERNAL_ERROR))
        }
    }
}

/// GET /api/v1/auth/me - Get current user profile (protected)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Getting current user profile for user_id: {}", claims.sub);

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.mongo.clone(), state.redis.clone(), jwt_service);

    let user = service
        .get_user_by_id(&claims.sub)
        .await
        .map_err(ApiError::from_service)?;

    Ok((StatusCode::OK, Json(UserProfile::from(user))))
}

/// POST /api/v1/auth/change-password - Change password (protected)
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(validation_error(&e));
    }

    tracing::info!("Changing password for user_id: {}", claims.sub);

    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let service = AuthService::new(state.mongo.clone(), state.redis.clone(), jwt_service);
    let audit_service = AuditService::new(state.mongo.clone());

    let user = service
        .get_user_by_id(&claims.sub)
        .await
        .map_err(ApiError::from_service)?;

    // Verify old password
    let old_password_ok = service
        .verify_password(&req.old_password, &user.password_hash)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    if !old_password_ok {
        let _ = audit_service
            .log_password_change(&claims.sub, false, Some("Invalid old password".to_string()))
            .await;

        return Err(ApiError::Unauthorized(
            messages::INVALID_OLD_PASSWORD.to_string(),
        ));
    }

    let new_password_hash = service
        .hash_password(&req.new_password)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    use mongodb::bson::{doc, oid::ObjectId};
    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::internal(messages::INTERNAL_ERROR))?;

    let users_collection = state.mongo.collection::<mongodb::bson::Document>("users");
    users_collection
        .update_one(
            doc! { "_id": user_id },
            doc! {
                "$set": {
                    "password_hash": new_password_hash,
                    "updatedAt": mongodb::bson::DateTime::now()
                }
            },
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to update password: {}", e);
            ApiError::internal(messages::INTERNAL_ERROR)
        })?;

    tracing::info!("Password changed successfully for user_id: {}", claims.sub);

    let _ = audit_service
        .log_password_change(&claims.sub, true, None)
        .await;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": messages::PASSWORD_CHANGED })),
    ))
}

/// GET /api/v1/auth/csrf-token - Get CSRF token for authenticated requests
/// Returns CSRF token in both JSON response and as a cookie
pub async fn get_csrf_token() -> Result<impl IntoResponse, ApiError> {
    use crate::middlewares::csrf::{generate_csrf_token, set_csrf_cookie};
    use axum::response::Response;

    tracing::debug!("Generating CSRF token");

    let token = generate_csrf_token();

    let json_response = Json(serde_json::json!({
        "csrf_token": token
    }));

    let response: Response = (StatusCode::OK, json_response).into_response();
    let response_with_cookie = set_csrf_cookie(response, &token);

    Ok(response_with_cookie)
}
