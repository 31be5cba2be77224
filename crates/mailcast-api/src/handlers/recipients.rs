//! Recipient handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use mailcast_core::RecipientInput;
use mailcast_storage::models::{Recipient, UpdateRecipient};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AppState, AuthContext};
use crate::error::ApiResult;

/// GET /api/v1/recipients
pub async fn list_recipients(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Recipient>>> {
    let recipients = state.services.recipients.list(&auth.actor).await?;
    Ok(Json(recipients))
}

/// POST /api/v1/recipients
pub async fn create_recipient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<RecipientInput>,
) -> ApiResult<(StatusCode, Json<Recipient>)> {
    let recipient = state.services.recipients.create(&auth.actor, input).await?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

/// GET /api/v1/recipients/:id
pub async fn get_recipient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Recipient>> {
    let recipient = state.services.recipients.get(&auth.actor, id).await?;
    Ok(Json(recipient))
}

/// PUT /api/v1/recipients/:id
pub async fn update_recipient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRecipient>,
) -> ApiResult<Json<Recipient>> {
    let recipient = state.services.recipients.update(&auth.actor, id, input).await?;
    Ok(Json(recipient))
}

/// DELETE /api/v1/recipients/:id
pub async fn delete_recipient(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.recipients.delete(&auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
