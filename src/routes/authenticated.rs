use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Routes for any signed-in user. The session layer above this router guarantees every
/// handler receives a resolved `AuthUser`; ownership checks happen in the handlers and
/// the repository, which scope queries by the caller's id.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/session
        // Profile, permissions and back-office flag for the client hooks.
        .route("/api/auth/session", get(handlers::auth::session))
        // --- Cars ---
        .route(
            "/api/cars",
            get(handlers::cars::list_cars).post(handlers::cars::create_car),
        )
        // Refused while the car has a PENDING or CONFIRMED booking.
        .route(
            "/api/cars/{id}",
            axum::routing::delete(handlers::cars::delete_car),
        )
        // --- Profile ---
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        .route(
            "/api/profile/password",
            patch(handlers::profile::change_password),
        )
        // --- Bookings ---
        .route(
            "/api/bookings",
            get(handlers::bookings::list_my_bookings).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/{id}", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/{id}/cancel",
            post(handlers::bookings::cancel_booking),
        )
        // --- Payments ---
        .route("/api/payments", get(handlers::payments::list_my_payments))
}
