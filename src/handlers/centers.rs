use axum::{
    Json,
    extract::State,
};
use chrono::{Days, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, AppPath, AppQuery, ErrorBody},
    models::{Center, TimeSlot},
    validation,
};

// --- Filter Structs ---

/// CenterFilter
///
/// Query parameters for GET /api/centers.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct CenterFilter {
    /// Case-insensitive city name.
    pub city: Option<String>,
}

/// SlotFilter
///
/// Query parameters for GET /api/centers/{id}/slots.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SlotFilter {
    /// Restricts the listing to one UTC day (`YYYY-MM-DD`).
    pub date: Option<String>,
}

/// list_centers
///
/// [Public Route] Active inspection centers, optionally filtered by city.
#[utoipa::path(
    get,
    path = "/api/centers",
    params(CenterFilter),
    responses((status = 200, description = "Active centers", body = [Center]))
)]
pub async fn list_centers(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<CenterFilter>,
) -> Result<Json<Vec<Center>>, ApiError> {
    let city = validation::optional_text(filter.city);
    Ok(Json(state.repo.list_centers(city, false).await?))
}

/// get_center
///
/// [Public Route] One active center. Deactivated centers are reported as missing.
#[utoipa::path(
    get,
    path = "/api/centers/{id}",
    params(("id" = Uuid, Path, description = "Center ID")),
    responses(
        (status = 200, description = "Found", body = Center),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_center(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Center>, ApiError> {
    match state.repo.get_center(id).await? {
        Some(center) if center.is_active => Ok(Json(center)),
        _ => Err(ApiError::not_found("Center not found")),
    }
}

/// list_slots
///
/// [Public Route] Future slots of a center that still have a free seat, earliest first.
#[utoipa::path(
    get,
    path = "/api/centers/{id}/slots",
    params(("id" = Uuid, Path, description = "Center ID"), SlotFilter),
    responses(
        (status = 200, description = "Bookable slots", body = [TimeSlot]),
        (status = 400, description = "Malformed date", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn list_slots(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(filter): AppQuery<SlotFilter>,
) -> Result<Json<Vec<TimeSlot>>, ApiError> {
    match state.repo.get_center(id).await? {
        Some(center) if center.is_active => {}
        _ => return Err(ApiError::not_found("Center not found")),
    }

    let now = Utc::now();
    let (from, to) = match filter.date.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(raw) => {
            let day = validation::parse_date(raw)?;
            let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
            let end = day
                .checked_add_days(Days::new(1))
                .map(|next| next.and_time(chrono::NaiveTime::MIN).and_utc());
            (start.max(now), end)
        }
        None => (now, None),
    };

    Ok(Json(state.repo.list_available_slots(id, from, to).await?))
}
