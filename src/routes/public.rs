use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session: the landing page and the identity
/// flow (login, logout, registration).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::landing))
        // GET renders the form, POST authenticates and redirects.
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        // GET renders the form, POST creates the account.
        .route("/register", get(handlers::register_form).post(handlers::register))
}
