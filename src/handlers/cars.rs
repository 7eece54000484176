use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, require_permission},
    error::{ApiError, AppJson, AppPath, ErrorBody},
    models::{Car, CreateCarRequest},
    rbac::Permission,
    validation,
};

/// list_cars
///
/// [Authenticated Route] The caller's cars, newest first.
#[utoipa::path(
    get,
    path = "/api/cars",
    responses(
        (status = 200, description = "My cars", body = [Car]),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn list_cars(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Car>>, ApiError> {
    require_permission(&user, Permission::ManageOwnCars)?;
    Ok(Json(state.repo.list_cars(user.id).await?))
}

/// create_car
///
/// [Authenticated Route] Registers a car for the caller. The plate number is normalized
/// (upper-case, no whitespace) before the uniqueness check.
#[utoipa::path(
    post,
    path = "/api/cars",
    request_body = CreateCarRequest,
    responses(
        (status = 201, description = "Car registered", body = Car),
        (status = 400, description = "Invalid input or plate already registered", body = ErrorBody),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn create_car(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCarRequest>,
) -> Result<(StatusCode, Json<Car>), ApiError> {
    require_permission(&user, Permission::ManageOwnCars)?;
    let car = validation::validate_car(payload)?;

    let created = state.repo.create_car(user.id, car).await?;
    tracing::info!(user_id = %user.id, car_id = %created.id, plate = %created.plate_number, "car registered");
    Ok((StatusCode::CREATED, Json(created)))
}

/// delete_car
///
/// [Authenticated Route] Removes one of the caller's cars.
///
/// *Ownership*: a car owned by someone else is reported as missing. A car with a
/// PENDING or CONFIRMED booking cannot be removed until that booking is settled.
#[utoipa::path(
    delete,
    path = "/api/cars/{id}",
    params(("id" = Uuid, Path, description = "Car ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Car has an active booking", body = ErrorBody),
        (status = 404, description = "Not Found or Not Yours", body = ErrorBody)
    )
)]
pub async fn delete_car(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_permission(&user, Permission::ManageOwnCars)?;

    if state.repo.delete_car(id, user.id).await? {
        tracing::info!(user_id = %user.id, car_id = %id, "car removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Car not found"))
    }
}
