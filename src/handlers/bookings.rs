use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, require_permission},
    error::{ApiError, AppJson, AppPath, ErrorBody},
    models::{Booking, BookingDetails, BookingStatus, CreateBookingRequest},
    rbac::Permission,
};

/// list_my_bookings
///
/// [Authenticated Route] The caller's bookings with center, car, slot and payment details.
#[utoipa::path(
    get,
    path = "/api/bookings",
    responses(
        (status = 200, description = "My bookings", body = [BookingDetails]),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn list_my_bookings(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    require_permission(&user, Permission::ViewOwnBookings)?;
    Ok(Json(state.repo.list_user_bookings(user.id).await?))
}

/// create_booking
///
/// [Authenticated Route] Books an inspection for one of the caller's cars.
///
/// The seat reservation, booking row and PENDING payment are written atomically by the
/// repository; a full or past slot is a 400.
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booked", body = Booking),
        (status = 400, description = "Slot full, past or unavailable", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody),
        (status = 404, description = "Unknown car or slot", body = ErrorBody)
    )
)]
pub async fn create_booking(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    require_permission(&user, Permission::BookInspection)?;

    let booking = state
        .repo
        .create_booking(user.id, payload.car_id, payload.time_slot_id, Utc::now())
        .await?;

    tracing::info!(
        user_id = %user.id,
        booking_id = %booking.id,
        slot_id = %booking.time_slot_id,
        "inspection booked"
    );
    Ok((StatusCode::CREATED, Json(booking)))
}

/// get_booking
///
/// [Authenticated Route] One booking. Visible to its owner and to roles holding
/// `ViewAllBookings`; everyone else gets a 404.
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Found", body = BookingDetails),
        (status = 404, description = "Not Found or Not Yours", body = ErrorBody)
    )
)]
pub async fn get_booking(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<BookingDetails>, ApiError> {
    match state.repo.get_booking(id).await? {
        Some(booking) if booking.user_id == user.id || user.can(Permission::ViewAllBookings) => {
            Ok(Json(booking))
        }
        _ => Err(ApiError::not_found("Booking not found")),
    }
}

/// cancel_booking
///
/// [Authenticated Route] Cancels a PENDING or CONFIRMED booking, freeing its seat.
/// Allowed for the owner and for roles holding `ManageBookings`.
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Cancelled", body = Booking),
        (status = 400, description = "Booking can no longer be cancelled", body = ErrorBody),
        (status = 404, description = "Not Found or Not Yours", body = ErrorBody)
    )
)]
pub async fn cancel_booking(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    match state.repo.get_booking(id).await? {
        Some(booking) if booking.user_id == user.id || user.can(Permission::ManageBookings) => {}
        _ => return Err(ApiError::not_found("Booking not found")),
    }

    let booking = state
        .repo
        .update_booking_status(id, BookingStatus::Cancelled)
        .await?;

    tracing::info!(user_id = %user.id, booking_id = %id, "booking cancelled");
    Ok(Json(booking))
}
