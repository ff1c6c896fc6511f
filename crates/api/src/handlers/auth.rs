//! Handlers for the `/auth` resource: registration, email verification,
//! login, password reset and the caller's own profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use parlor_core::error::CoreError;
use parlor_core::roles::ROLE_USER;
use parlor_core::types::DbId;
use parlor_db::models::user::{CreateUser, User, UserResponse};
use parlor_events::{event_types, DomainEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::token::generate_one_time_token;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthUser;
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: DbId,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
///
/// Creates an unverified user and publishes `user.registered`, which the
/// account notifier turns into a verification email.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    validate_password_strength(&input.password, state.config.password_min_length)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let email = normalize_email(&input.email);
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let verification_token = generate_one_time_token();

    let user = state
        .users
        .create(&CreateUser {
            name: input.name.trim().to_string(),
            email,
            password_hash,
            role: ROLE_USER.to_string(),
            verification_token: Some(verification_token.clone()),
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");
    state.event_bus.publish(
        DomainEvent::new(event_types::USER_REGISTERED)
            .with_subject("user", user.id)
            .with_actor(user.id)
            .with_payload(json!({
                "email": user.email,
                "name": user.name,
                "verification_token": verification_token,
            })),
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id: user.id }),
    ))
}

/// POST /api/auth/login
///
/// The password is checked before the verification flag so an unverified
/// account is only revealed to someone who knows its password.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .users
        .find_by_email(&normalize_email(&input.email))
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    if !check_password(&input.password, &user)? {
        tracing::warn!(user_id = %user.id, "Login rejected: bad password");
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    if !user.is_verified {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Please verify your email before logging in".into(),
        )));
    }

    state.users.record_login(user.id).await?;
    let token = generate_token(user.id, &user.email, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let user = state.users.find_by_id(user.id).await?.unwrap_or(user);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user: UserResponse::from(&user),
        token,
    }))
}

/// POST /api/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<VerifyEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = state
        .users
        .find_by_verification_token(&input.token)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid verification token".into()))?;

    state.users.mark_verified(user.id).await?;
    tracing::info!(user_id = %user.id, "Email verified");
    state.event_bus.publish(
        DomainEvent::new(event_types::USER_VERIFIED)
            .with_subject("user", user.id)
            .with_actor(user.id),
    );

    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// POST /api/auth/forgot-password
///
/// Always answers 200 so the endpoint cannot be used to probe for accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let acknowledgement =
        MessageResponse::new("If an account exists for that email, a reset link has been sent");

    let Some(user) = state
        .users
        .find_by_email(&normalize_email(&input.email))
        .await?
    else {
        return Ok(Json(acknowledgement));
    };

    let token = generate_one_time_token();
    let expires = Utc::now() + chrono::Duration::minutes(state.config.reset_token_ttl_mins);
    state.users.set_reset_token(user.id, &token, expires).await?;

    tracing::info!(user_id = %user.id, "Password reset requested");
    state.event_bus.publish(
        DomainEvent::new(event_types::PASSWORD_RESET_REQUESTED)
            .with_subject("user", user.id)
            .with_payload(json!({
                "email": user.email,
                "name": user.name,
                "reset_token": token,
            })),
    );

    Ok(Json(acknowledgement))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    validate_password_strength(&input.password, state.config.password_min_length)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let user = state
        .users
        .find_by_reset_token(&input.token, Utc::now())
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    state.users.update_password(user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password reset");
    Ok(Json(MessageResponse::new("Password has been reset")))
}

/// GET /api/auth/me
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ProfileResponse>> {
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(ProfileResponse {
        user: UserResponse::from(&user),
    }))
}

/// PATCH /api/auth/me
pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let user = state
        .users
        .update_name(auth.user_id, input.name.trim())
        .await?
        .ok_or(AppError::Core(CoreError::not_found("User", auth.user_id)))?;
    Ok(Json(ProfileResponse {
        user: UserResponse::from(&user),
    }))
}

/// DELETE /api/auth/me
///
/// Requires the current password.
pub async fn delete_me(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<DeleteAccountRequest>,
) -> AppResult<StatusCode> {
    let user = load_user(&state, auth.user_id).await?;
    if !check_password(&input.password, &user)? {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Password is incorrect".into(),
        )));
    }

    state.users.delete(user.id).await?;
    tracing::info!(user_id = %user.id, "Account deleted");
    state.event_bus.publish(
        DomainEvent::new(event_types::USER_DELETED)
            .with_subject("user", user.id)
            .with_actor(user.id),
    );

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password(password: &str, user: &User) -> AppResult<bool> {
    verify_password(password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))
}

async fn load_user(state: &AppState, id: DbId) -> AppResult<User> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("User", id)))
}
