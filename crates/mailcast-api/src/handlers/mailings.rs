//! Mailing handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use mailcast_core::{LaunchOutcome, MailingDetail, MailingInput};
use mailcast_storage::models::{Mailing, UpdateMailing};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AppState, AuthContext};
use crate::error::ApiResult;

/// GET /api/v1/mailings
pub async fn list_mailings(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Mailing>>> {
    let mailings = state.services.mailings.list(&auth.actor).await?;
    Ok(Json(Vec::clone(&mailings)))
}

/// POST /api/v1/mailings
pub async fn create_mailing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<MailingInput>,
) -> ApiResult<(StatusCode, Json<Mailing>)> {
    let mailing = state.services.mailings.create(&auth.actor, input).await?;
    Ok((StatusCode::CREATED, Json(mailing)))
}

/// GET /api/v1/mailings/:id
pub async fn get_mailing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MailingDetail>> {
    let detail = state.services.mailings.get(&auth.actor, id).await?;
    Ok(Json(detail))
}

/// PUT /api/v1/mailings/:id
pub async fn update_mailing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMailing>,
) -> ApiResult<Json<Mailing>> {
    let mailing = state.services.mailings.update(&auth.actor, id, input).await?;
    Ok(Json(mailing))
}

/// DELETE /api/v1/mailings/:id
pub async fn delete_mailing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.mailings.delete(&auth.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Launch a mailing and send it
///
/// POST /api/v1/mailings/:id/send
pub async fn send_mailing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LaunchOutcome>> {
    let outcome = state.services.sender.launch(&auth.actor, id).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/mailings/:id/stop
pub async fn stop_mailing(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Mailing>> {
    let mailing = state.services.sender.stop(&auth.actor, id).await?;
    Ok(Json(mailing))
}
