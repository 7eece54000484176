//! API handlers, one module per resource.
//!
//! Every handler returns `Result<_, ApiError>` and reads JSON bodies through
//! [`AppJson`](crate::error::AppJson) so malformed input is a uniform 400.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod cars;
pub mod centers;
pub mod payments;
pub mod profile;

/// health
///
/// [Public Route] Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
