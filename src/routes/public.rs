use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The forgot-password endpoint answers the same
/// way for known and unknown emails, so nothing here reveals which accounts exist.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health))
        // --- Credentials ---
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        // Clears the session cookie; harmless without one.
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        // --- Center discovery ---
        // GET /api/centers?city=...
        // Only active centers are ever listed here.
        .route("/api/centers", get(handlers::centers::list_centers))
        .route("/api/centers/{id}", get(handlers::centers::get_center))
        // GET /api/centers/{id}/slots?date=YYYY-MM-DD
        .route("/api/centers/{id}/slots", get(handlers::centers::list_slots))
}
