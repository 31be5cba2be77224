//! Mailcast API - REST API server
//!
//! This crate exposes the mailing service over HTTP: account endpoints,
//! recipient/message/mailing management, the attempt log, user
//! administration and the OpenAPI description.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use auth::{AppState, AuthContext};
pub use error::ApiError;
pub use openapi::create_openapi_routes;
pub use routes::create_router;

#[cfg(test)]
mod tests;
