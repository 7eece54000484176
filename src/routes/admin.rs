use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Admin Router Module
///
/// Back-office endpoints, nested under `/api/admin` and wrapped in the session layer.
/// STAFF and ADMIN share this router; each handler calls `require_permission` with the
/// permission its action needs, so e.g. STAFF can confirm bookings but not manage users.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/stats (AccessAdmin)
        .route("/stats", get(handlers::admin::get_stats))
        // --- Users (ManageUsers) ---
        .route("/users", get(handlers::admin::list_users))
        .route("/users/{id}/role", patch(handlers::admin::update_user_role))
        // --- Bookings (ViewAllBookings / ManageBookings) ---
        .route("/bookings", get(handlers::admin::list_bookings))
        .route(
            "/bookings/{id}/status",
            patch(handlers::admin::update_booking_status),
        )
        // --- Centers (ManageCenters) and slots (ManageTimeSlots) ---
        .route("/centers", post(handlers::admin::create_center))
        .route("/centers/{id}", patch(handlers::admin::update_center))
        .route("/centers/{id}/slots", post(handlers::admin::create_slot))
        // --- Payments (ViewAllPayments / ManagePayments) ---
        .route("/payments", get(handlers::admin::list_payments))
        .route(
            "/payments/{id}/status",
            patch(handlers::admin::update_payment_status),
        )
}
