//! Dashboard statistics handler

use axum::{extract::State, Json};
use mailcast_storage::models::MailingStats;
use std::sync::Arc;

use crate::auth::AppState;
use crate::error::ApiResult;

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<MailingStats>> {
    let stats = state.services.stats.stats().await?;
    Ok(Json(stats))
}
