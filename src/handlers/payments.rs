use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{AuthUser, require_permission},
    error::{ApiError, ErrorBody},
    models::Payment,
    rbac::Permission,
};

/// list_my_payments
///
/// [Authenticated Route] Payments attached to the caller's bookings, newest first.
#[utoipa::path(
    get,
    path = "/api/payments",
    responses(
        (status = 200, description = "My payments", body = [Payment]),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn list_my_payments(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    require_permission(&user, Permission::ViewOwnPayments)?;
    Ok(Json(state.repo.list_user_payments(user.id).await?))
}
