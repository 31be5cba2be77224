//! Authentication module

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use mailcast_common::Error;
use mailcast_core::{Actor, Services};
use mailcast_storage::DatabasePool;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    pub services: Services,
    /// Present when running against PostgreSQL; used by the readiness probe
    pub db_pool: Option<DatabasePool>,
}

impl AppState {
    pub fn new(services: Services, db_pool: Option<DatabasePool>) -> Self {
        Self { services, db_pool }
    }
}

/// Authenticated context extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub actor: Actor,
    /// The raw token, kept so logout can revoke it
    pub token: String,
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| {
            warn!("Missing bearer token in request to {}", request.uri().path());
            Error::Auth("Missing bearer token".to_string())
        })?
        .to_string();

    let actor = state.services.accounts.authenticate(&token).await.map_err(|e| {
        warn!(error = %e, "Rejected bearer token");
        e
    })?;
    debug!(user_id = %actor.user_id, "Request authenticated");

    request.extensions_mut().insert(AuthContext { actor, token });

    Ok(next.run(request).await)
}
