use crate::{AppState, pages};
use axum::{Router, routing::get};

/// Pages Router Module
///
/// Locale-prefixed page routes. The `{locale}` segment accepts anything at the router
/// level; the page guard layered on top of this router rejects unsupported locales and
/// applies the RBAC route table before any loader runs.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        // --- Public ---
        .route("/{locale}", get(pages::home))
        .route("/{locale}/auth/signin", get(pages::signin))
        .route("/{locale}/auth/reset-password", get(pages::reset_password))
        .route("/{locale}/unauthorized", get(pages::unauthorized))
        // --- Signed-in ---
        .route("/{locale}/centers", get(pages::centers))
        .route("/{locale}/cars", get(pages::cars))
        .route("/{locale}/booking", get(pages::booking))
        .route("/{locale}/bookings", get(pages::bookings))
        .route("/{locale}/profile", get(pages::profile))
        // --- Back-office (permission per sub-path) ---
        .route("/{locale}/admin", get(pages::admin_dashboard))
        .route("/{locale}/admin/users", get(pages::admin_users))
        .route("/{locale}/admin/bookings", get(pages::admin_bookings))
        .route("/{locale}/admin/centers", get(pages::admin_centers))
        .route("/{locale}/admin/payments", get(pages::admin_payments))
}
