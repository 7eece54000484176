use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, require_permission},
    error::{ApiError, AppJson, AppPath, AppQuery, ErrorBody},
    models::{
        AdminStats, Booking, BookingDetails, BookingStatus, Center, CreateCenterRequest,
        CreateTimeSlotRequest, Payment, PaymentStatus, TimeSlot, UpdateBookingStatusRequest,
        UpdateCenterRequest, UpdatePaymentStatusRequest, UpdateRoleRequest, UserProfile,
    },
    rbac::Permission,
    validation,
};

/// StatusFilter
///
/// `?status=` filter shared by the admin booking and payment listings.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct StatusFilter {
    /// Upper-case status name, e.g. `PENDING`.
    pub status: Option<String>,
}

impl StatusFilter {
    fn parse<T: TryFrom<String>>(&self) -> Result<Option<T>, ApiError> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => T::try_from(raw.to_uppercase())
                .map(Some)
                .map_err(|_| ApiError::validation(format!("Unknown status: {raw}"))),
        }
    }
}

/// get_stats
///
/// [Admin Route] Dashboard counters. Requires `AccessAdmin` (STAFF and ADMIN).
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminStats),
        (status = 403, description = "Missing permission", body = ErrorBody)
    )
)]
pub async fn get_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, ApiError> {
    require_permission(&user, Permission::AccessAdmin)?;
    Ok(Json(state.repo.get_stats().await?))
}

/// list_users
///
/// [Admin Route] Every account, newest first. Requires `ManageUsers`.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserProfile]),
        (status = 403, description = "Missing permission", body = ErrorBody)
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    require_permission(&user, Permission::ManageUsers)?;
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

/// update_user_role
///
/// [Admin Route] Changes another account's role. Requires `ManageUsers`; an admin may not
/// change their own role.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Own role", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_user_role(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    require_permission(&user, Permission::ManageUsers)?;
    if id == user.id {
        return Err(ApiError::validation("You cannot change your own role"));
    }

    let updated = state
        .repo
        .set_user_role(id, payload.role)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(admin_id = %user.id, user_id = %id, role = ?payload.role, "role changed");
    Ok(Json(updated.into()))
}

/// list_bookings
///
/// [Admin Route] All bookings, optionally filtered by status. Requires `ViewAllBookings`.
#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    params(StatusFilter),
    responses(
        (status = 200, description = "All bookings", body = [BookingDetails]),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody)
    )
)]
pub async fn list_bookings(
    user: AuthUser,
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<StatusFilter>,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    require_permission(&user, Permission::ViewAllBookings)?;
    let status = filter.parse::<BookingStatus>()?;
    Ok(Json(state.repo.list_bookings(status).await?))
}

/// update_booking_status
///
/// [Admin Route] Moves a booking along its lifecycle. Requires `ManageBookings`; illegal
/// transitions are a 400.
#[utoipa::path(
    patch,
    path = "/api/admin/bookings/{id}/status",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Booking),
        (status = 400, description = "Illegal transition", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_booking_status(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, ApiError> {
    require_permission(&user, Permission::ManageBookings)?;

    let booking = state
        .repo
        .update_booking_status(id, payload.status)
        .await?;

    tracing::info!(staff_id = %user.id, booking_id = %id, status = ?booking.status, "booking status changed");
    Ok(Json(booking))
}

/// create_center
///
/// [Admin Route] Opens a new inspection center. Requires `ManageCenters`.
#[utoipa::path(
    post,
    path = "/api/admin/centers",
    request_body = CreateCenterRequest,
    responses(
        (status = 201, description = "Created", body = Center),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody)
    )
)]
pub async fn create_center(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCenterRequest>,
) -> Result<(StatusCode, Json<Center>), ApiError> {
    require_permission(&user, Permission::ManageCenters)?;
    let request = validation::validate_center(payload)?;

    let center = state.repo.create_center(request).await?;
    tracing::info!(admin_id = %user.id, center_id = %center.id, "center created");
    Ok((StatusCode::CREATED, Json(center)))
}

/// update_center
///
/// [Admin Route] Partial update, including (de)activation. Requires `ManageCenters`.
#[utoipa::path(
    patch,
    path = "/api/admin/centers/{id}",
    params(("id" = Uuid, Path, description = "Center ID")),
    request_body = UpdateCenterRequest,
    responses(
        (status = 200, description = "Updated", body = Center),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_center(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateCenterRequest>,
) -> Result<Json<Center>, ApiError> {
    require_permission(&user, Permission::ManageCenters)?;

    let non_blank = |value: Option<String>, field: &str| -> Result<Option<String>, ApiError> {
        value
            .as_deref()
            .map(|v| validation::required(v, field))
            .transpose()
    };
    if payload.price_cents.is_some_and(|price| price < 0) {
        return Err(ApiError::validation("Price cannot be negative"));
    }

    let request = UpdateCenterRequest {
        name: non_blank(payload.name, "Name")?,
        city: non_blank(payload.city, "City")?,
        address: non_blank(payload.address, "Address")?,
        phone: validation::optional_text(payload.phone),
        price_cents: payload.price_cents,
        is_active: payload.is_active,
    };

    let center = state
        .repo
        .update_center(id, request)
        .await?
        .ok_or_else(|| ApiError::not_found("Center not found"))?;

    tracing::info!(admin_id = %user.id, center_id = %id, active = center.is_active, "center updated");
    Ok(Json(center))
}

/// create_slot
///
/// [Admin Route] Publishes a bookable time slot at a center. Requires `ManageTimeSlots`.
#[utoipa::path(
    post,
    path = "/api/admin/centers/{id}/slots",
    params(("id" = Uuid, Path, description = "Center ID")),
    request_body = CreateTimeSlotRequest,
    responses(
        (status = 201, description = "Created", body = TimeSlot),
        (status = 400, description = "Invalid window or capacity", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody),
        (status = 404, description = "Center Not Found", body = ErrorBody)
    )
)]
pub async fn create_slot(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(center_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateTimeSlotRequest>,
) -> Result<(StatusCode, Json<TimeSlot>), ApiError> {
    require_permission(&user, Permission::ManageTimeSlots)?;
    validation::validate_slot(&payload)?;

    let slot = state.repo.create_slot(center_id, payload).await?;
    tracing::info!(staff_id = %user.id, center_id = %center_id, slot_id = %slot.id, "time slot created");
    Ok((StatusCode::CREATED, Json(slot)))
}

/// list_payments
///
/// [Admin Route] All payments, optionally filtered by status. Requires `ViewAllPayments`.
#[utoipa::path(
    get,
    path = "/api/admin/payments",
    params(StatusFilter),
    responses(
        (status = 200, description = "All payments", body = [Payment]),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody)
    )
)]
pub async fn list_payments(
    user: AuthUser,
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<StatusFilter>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    require_permission(&user, Permission::ViewAllPayments)?;
    let status = filter.parse::<PaymentStatus>()?;
    Ok(Json(state.repo.list_payments(status).await?))
}

/// update_payment_status
///
/// [Admin Route] Marks a payment PAID or REFUNDED. Requires `ManagePayments` (ADMIN only).
#[utoipa::path(
    patch,
    path = "/api/admin/payments/{id}/status",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Payment),
        (status = 400, description = "Illegal transition", body = ErrorBody),
        (status = 403, description = "Missing permission", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_payment_status(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdatePaymentStatusRequest>,
) -> Result<Json<Payment>, ApiError> {
    require_permission(&user, Permission::ManagePayments)?;

    let payment = state
        .repo
        .update_payment_status(id, payload.status)
        .await?;

    tracing::info!(admin_id = %user.id, payment_id = %id, status = ?payment.status, "payment status changed");
    Ok(Json(payment))
}
