//! Contact form handler

use axum::{extract::State, Json};
use mailcast_core::ContactForm;
use std::sync::Arc;

use super::MessageResponse;
use crate::auth::AppState;
use crate::error::ApiResult;

/// POST /api/v1/contacts
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ContactForm>,
) -> ApiResult<Json<MessageResponse>> {
    let reply = state.services.contact.submit(form).await?;
    Ok(Json(MessageResponse::new(reply)))
}
