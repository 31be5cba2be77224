//! API routes

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AppState};
use crate::handlers::{
    accounts, attempts, contacts, health, mailings, messages, recipients, stats, users,
};
use crate::openapi::create_openapi_routes;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/", get(health::health))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .with_state(state.clone());

    // Account routes reachable without a token
    let account_routes = Router::new()
        .route("/register", post(accounts::register))
        .route("/confirm/:token", get(accounts::confirm_email))
        .route("/login", post(accounts::login))
        .route("/password-recovery", post(accounts::request_password_reset))
        .route("/password-reset", post(accounts::reset_password));

    let public_v1 = Router::new()
        .nest("/accounts", account_routes)
        .route("/contacts", post(contacts::submit_contact))
        .with_state(state.clone());

    // Recipient routes
    let recipient_routes = Router::new()
        .route(
            "/",
            get(recipients::list_recipients).post(recipients::create_recipient),
        )
        .route(
            "/:id",
            get(recipients::get_recipient)
                .put(recipients::update_recipient)
                .delete(recipients::delete_recipient),
        );

    // Message routes
    let message_routes = Router::new()
        .route("/", get(messages::list_messages).post(messages::create_message))
        .route(
            "/:id",
            get(messages::get_message)
                .put(messages::update_message)
                .delete(messages::delete_message),
        );

    // Mailing routes
    let mailing_routes = Router::new()
        .route("/", get(mailings::list_mailings).post(mailings::create_mailing))
        .route(
            "/:id",
            get(mailings::get_mailing)
                .put(mailings::update_mailing)
                .delete(mailings::delete_mailing),
        )
        .route("/:id/send", post(mailings::send_mailing))
        .route("/:id/stop", post(mailings::stop_mailing));

    // User administration routes
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/:id", get(users::get_user).put(users::update_user))
        .route("/:id/block", post(users::block_user))
        .route("/:id/unblock", post(users::unblock_user))
        .route("/:id/roles", put(users::set_roles));

    // API v1 routes with authentication
    let protected_v1 = Router::new()
        .route("/accounts/logout", post(accounts::logout))
        .route("/stats", get(stats::get_stats))
        .route("/attempts", get(attempts::list_attempts))
        .nest("/recipients", recipient_routes)
        .nest("/messages", message_routes)
        .nest("/mailings", mailing_routes)
        .nest("/users", user_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    // OpenAPI documentation routes
    let openapi_routes = create_openapi_routes();

    // Combine all routes
    Router::new()
        .nest("/health", health_routes)
        .nest("/api/v1", public_v1.merge(protected_v1))
        .merge(openapi_routes)
        .layer(TraceLayer::new_for_http())
}
