//! Attempt log handlers

use axum::{extract::State, Extension, Json};
use mailcast_storage::models::MailingAttempt;
use std::sync::Arc;

use crate::auth::{AppState, AuthContext};
use crate::error::ApiResult;

/// GET /api/v1/attempts
pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<MailingAttempt>>> {
    let attempts = state.services.attempts.list_for(&auth.actor).await?;
    Ok(Json(attempts))
}
