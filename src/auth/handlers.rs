//! Auth flow handlers
//!
//! Registration, login, session introspection, profile and password
//! updates, and the two-step password reset. Everything stateful about a
//! session lives in the token itself; the handlers only ever touch the
//! users table.

use crate::api::extract::ValidJson;
use crate::api::handlers::AppState;
use crate::auth::guard;
use crate::auth::middleware::AuthUser;
use crate::auth::models::*;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenPurpose;
use crate::core::error::{AtriumError, Result};
use crate::db::models::{ProfileChanges, User};
use crate::db::repository::Repository;
use axum::{extract::State, Json};
use std::time::Duration;

fn session_ttl(state: &AppState) -> Option<Duration> {
    match state.config.security.session_ttl_days {
        0 => None,
        days => Some(Duration::from_secs(days * 24 * 60 * 60)),
    }
}

async fn load_user(state: &AppState, uuid: &str) -> Result<User> {
    state
        .user_repo
        .find_by_id(uuid)
        .await?
        .ok_or_else(|| AtriumError::NotFound("User not found".to_string()))
}

/// POST /api/user
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<Json<LoginResponse>> {
    req.validate()?;

    let user = User {
        uuid: uuid::Uuid::new_v4().to_string(),
        screen_name: req.screen_name.trim().to_string(),
        display_name: req
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| req.screen_name.trim().to_string()),
        email: req.email.clone(),
        password_hash: hash_password(&req.password)?,
        token_epoch: 0,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    state.user_repo.create(&user).await?;

    tracing::info!(user_uuid = %user.uuid, screen_name = %user.screen_name, "Registered user");
    state.mailer.send_verification(&user.email, &user.screen_name);

    let jwt = state
        .tokens
        .issue(&user.uuid, user.token_epoch, TokenPurpose::Session, session_ttl(&state))?;
    Ok(Json(LoginResponse {
        user: UserResponse::from_user(&user),
        jwt,
    }))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    req.validate()?;

    // Unknown email and wrong password produce the same 401
    let user = state
        .user_repo
        .find_by_email(&req.email)
        .await?
        .ok_or_else(AtriumError::bad_credentials)?;
    if !verify_password(&req.password, &user.password_hash) {
        tracing::debug!(user_uuid = %user.uuid, "Login with wrong password");
        return Err(AtriumError::bad_credentials());
    }

    let jwt = state
        .tokens
        .issue(&user.uuid, user.token_epoch, TokenPurpose::Session, session_ttl(&state))?;
    tracing::info!(user_uuid = %user.uuid, "Logged in");
    Ok(Json(LoginResponse {
        user: UserResponse::from_user(&user),
        jwt,
    }))
}

/// GET /api/user/me. Always 200; anonymous callers just get the flag.
pub async fn me(user: Option<AuthUser>) -> Json<MeResponse> {
    match user {
        Some(user) => Json(MeResponse {
            logged_in: true,
            user: Some(
                UserResponse {
                    uuid: user.uuid,
                    screen_name: user.screen_name,
                    display_name: user.display_name,
                    email: user.email,
                    created_at: user.created_at,
                    roles: None,
                }
                .with_roles(user.roles),
            ),
        }),
        None => Json(MeResponse {
            logged_in: false,
            user: None,
        }),
    }
}

/// POST /api/user/me/update
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> Result<Json<UserEnvelope>> {
    req.validate()?;
    let target = req.uuid.clone().unwrap_or_else(|| caller.uuid.clone());
    guard::ensure_can_access(&caller, &target)?;

    let changes = ProfileChanges {
        screen_name: req.screen_name.map(|n| n.trim().to_string()),
        display_name: req.display_name,
        email: req.email,
    };
    if !changes.is_empty() {
        state.user_repo.update_profile(&target, changes).await?;
        tracing::info!(user_uuid = %target, actor = %caller.uuid, "Updated profile");
    }

    let user = load_user(&state, &target).await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from_user(&user),
    }))
}

/// POST /api/user/me/update-password
///
/// The current password is always the CALLER's, even when an admin
/// resets somebody else. The hash swap and the epoch bump happen in one
/// UPDATE, so every outstanding session for the target dies at once.
pub async fn update_password(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidJson(req): ValidJson<UpdatePasswordRequest>,
) -> Result<Json<UserEnvelope>> {
    req.validate()?;
    let target = req.uuid.clone().unwrap_or_else(|| caller.uuid.clone());
    guard::ensure_can_access(&caller, &target)?;

    let caller_row = load_user(&state, &caller.uuid).await?;
    if !verify_password(&req.password, &caller_row.password_hash) {
        return Err(AtriumError::bad_credentials());
    }

    let hash = hash_password(&req.new_password)?;
    state.user_repo.update_password(&target, &hash).await?;
    tracing::info!(user_uuid = %target, actor = %caller.uuid, "Changed password");

    let user = load_user(&state, &target).await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from_user(&user),
    }))
}

/// POST /api/user/reset-password. Always 200 whether the address resolves or not.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<Json<StatusResponse>> {
    req.validate()?;

    if let Some(user) = state.user_repo.find_by_email(&req.email).await? {
        let ttl = Duration::from_secs(state.config.security.reset_ttl_minutes * 60);
        let token = state
            .tokens
            .issue(&user.uuid, user.token_epoch, TokenPurpose::Reset, Some(ttl))?;
        state.mailer.send_password_reset(&user.email, &token);
        tracing::info!(user_uuid = %user.uuid, "Issued password-reset token");
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(Json(StatusResponse::ok()))
}

/// POST /api/user/set-password. Completes a reset with the emailed token.
pub async fn set_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SetPasswordRequest>,
) -> Result<Json<UserEnvelope>> {
    let claims = state.tokens.verify(&req.token, TokenPurpose::Reset)?;
    req.validate()?;

    // The reset token is not epoch-bound; its short TTL is the defense
    let user = state
        .user_repo
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(AtriumError::invalid_token)?;

    let hash = hash_password(&req.password)?;
    state.user_repo.update_password(&user.uuid, &hash).await?;
    tracing::info!(user_uuid = %user.uuid, "Completed password reset");

    let user = load_user(&state, &user.uuid).await?;
    Ok(Json(UserEnvelope {
        user: UserResponse::from_user(&user),
    }))
}
