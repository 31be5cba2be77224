//! Message handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use mailcast_core::MessageInput;
use mailcast_storage::models::{Message, UpdateMessage};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AppState, AuthContext};
use crate::error::ApiResult;

/// GET /api/v1/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state.services.messages.list(&auth.actor).await?;
    Ok(Json(messages))
}

/// POST /api/v1/messages
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<MessageInput>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state.services.messages.create(&auth.actor, input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/messages/:id
pub async fn get_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    let message = state.services.messages.get(&auth.actor, id).await?;
    Ok(Json(message))
}

/// PUT /api/v1/messages/:id
pub async fn update_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMessage>,
) -> ApiResult<Json<Message>> {
    let message = state.services.messages.update(&auth.actor, id, input).await?;
    Ok(Json(message))
}

/// DELETE /api/v1/messages/:id
///
/// Mailings that send this message are deleted with it.
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.messages.delete(&auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
