//! User administration handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use mailcast_common::types::Page;
use mailcast_core::UserDetail;
use mailcast_storage::models::{UpdateUser, User, UserRoles};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AppState, AuthContext};
use crate::error::ApiResult;

/// Query parameters for listing users
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let page = Page {
        limit: query.limit.clamp(1, 500),
        offset: query.offset.max(0),
    };
    let users = state.services.accounts.list_users(&auth.actor, page).await?;
    Ok(Json(users))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserDetail>> {
    let user = state.services.accounts.get_user(&auth.actor, id).await?;
    Ok(Json(user))
}

/// PUT /api/v1/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<Json<User>> {
    let user = state.services.accounts.update_user(&auth.actor, id, input).await?;
    Ok(Json(user))
}

/// POST /api/v1/users/:id/block
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let user = state.services.accounts.set_active(&auth.actor, id, false).await?;
    Ok(Json(user))
}

/// POST /api/v1/users/:id/unblock
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let user = state.services.accounts.set_active(&auth.actor, id, true).await?;
    Ok(Json(user))
}

/// PUT /api/v1/users/:id/roles
pub async fn set_roles(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(roles): Json<UserRoles>,
) -> ApiResult<Json<UserDetail>> {
    let user = state.services.accounts.set_roles(&auth.actor, id, roles).await?;
    Ok(Json(user))
}
