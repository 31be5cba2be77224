//! Account handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use mailcast_core::{Registration, Session};
use mailcast_storage::models::User;
use serde::Deserialize;
use std::sync::Arc;

use super::MessageResponse;
use crate::auth::{AppState, AuthContext};
use crate::error::ApiResult;

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password recovery request
#[derive(Debug, Deserialize)]
pub struct PasswordRecoveryRequest {
    pub email: String,
}

/// Password reset request
#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// POST /api/v1/accounts/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<Registration>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.services.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/accounts/confirm/:token
pub async fn confirm_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state.services.accounts.confirm_email(&token).await?;
    Ok(Json(user))
}

/// POST /api/v1/accounts/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Session>> {
    let session = state.services.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// POST /api/v1/accounts/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.services.accounts.logout(&auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/accounts/password-recovery
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordRecoveryRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    state
        .services
        .accounts
        .request_password_reset(&req.email)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("A reset code has been sent to your email")),
    ))
}

/// POST /api/v1/accounts/password-reset
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .accounts
        .reset_password(&req.token, &req.password, &req.password_confirm)
        .await?;
    Ok(Json(MessageResponse::new("Password has been changed")))
}
