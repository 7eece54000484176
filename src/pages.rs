//! Server-side page loaders.
//!
//! Each locale-prefixed page answers with its view-model as JSON, wrapped in a
//! [`PageResponse`] that carries the locale and text direction for the renderer.
//! Access control already ran in [`crate::guard::page_guard`].

use axum::{
    Json,
    extract::State,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser, require_permission},
    error::{ApiError, AppPath, AppQuery},
    locale::Locale,
    models::{AdminStats, BookingDetails, Car, Center, Payment, Role, UserProfile},
    rbac::{self, Permission},
};

/// PageUser
///
/// The session summary every page carries for navigation rendering.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageUser {
    pub id: uuid::Uuid,
    pub email: String,
    pub role: Role,
    pub can_access_admin: bool,
}

impl From<&AuthUser> for PageUser {
    fn from(user: &AuthUser) -> Self {
        PageUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            can_access_admin: rbac::can_access_admin(user.role),
        }
    }
}

/// PageResponse
///
/// Envelope of every page: `{locale, dir, user?, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub locale: Locale,
    pub dir: String,
    pub user: Option<PageUser>,
    pub data: T,
}

type Page<T> = Result<Json<PageResponse<T>>, ApiError>;

fn page<T>(locale: &str, user: Option<&AuthUser>, data: T) -> Page<T> {
    let locale =
        Locale::from_segment(locale).ok_or_else(|| ApiError::not_found("Page not found"))?;
    Ok(Json(PageResponse {
        locale,
        dir: locale.direction().to_string(),
        user: user.map(PageUser::from),
        data,
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HomeData {
    pub active_centers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingPageData {
    pub cars: Vec<Car>,
    pub centers: Vec<Center>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SigninData {
    #[serde(rename = "callbackUrl", default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResetPasswordData {
    #[serde(default)]
    pub token: Option<String>,
}

// --- Public pages ---

pub async fn home(
    AppPath(locale): AppPath<String>,
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
) -> Page<HomeData> {
    let centers = state.repo.list_centers(None, false).await?;
    page(
        &locale,
        user.as_ref(),
        HomeData {
            active_centers: centers.len(),
        },
    )
}

pub async fn signin(
    AppPath(locale): AppPath<String>,
    MaybeAuthUser(user): MaybeAuthUser,
    AppQuery(query): AppQuery<SigninData>,
) -> Page<SigninData> {
    page(&locale, user.as_ref(), query)
}

pub async fn reset_password(
    AppPath(locale): AppPath<String>,
    AppQuery(query): AppQuery<ResetPasswordData>,
) -> Page<ResetPasswordData> {
    page(&locale, None, query)
}

pub async fn unauthorized(
    AppPath(locale): AppPath<String>,
    MaybeAuthUser(user): MaybeAuthUser,
) -> Page<()> {
    page(&locale, user.as_ref(), ())
}

// --- Signed-in pages ---

pub async fn centers(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<Center>> {
    let centers = state.repo.list_centers(None, false).await?;
    page(&locale, Some(&user), centers)
}

pub async fn cars(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<Car>> {
    let cars = state.repo.list_cars(user.id).await?;
    page(&locale, Some(&user), cars)
}

pub async fn booking(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<BookingPageData> {
    let cars = state.repo.list_cars(user.id).await?;
    let centers = state.repo.list_centers(None, false).await?;
    page(&locale, Some(&user), BookingPageData { cars, centers })
}

pub async fn bookings(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<BookingDetails>> {
    let bookings = state.repo.list_user_bookings(user.id).await?;
    page(&locale, Some(&user), bookings)
}

pub async fn profile(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<UserProfile> {
    let profile = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    page(&locale, Some(&user), profile.into())
}

// --- Back-office pages ---

pub async fn admin_dashboard(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<AdminStats> {
    require_permission(&user, Permission::AccessAdmin)?;
    let stats = state.repo.get_stats().await?;
    page(&locale, Some(&user), stats)
}

pub async fn admin_users(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<UserProfile>> {
    require_permission(&user, Permission::ManageUsers)?;
    let users = state.repo.list_users().await?;
    page(
        &locale,
        Some(&user),
        users.into_iter().map(UserProfile::from).collect(),
    )
}

pub async fn admin_bookings(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<BookingDetails>> {
    require_permission(&user, Permission::ViewAllBookings)?;
    let bookings = state.repo.list_bookings(None).await?;
    page(&locale, Some(&user), bookings)
}

/// Includes deactivated centers so they can be switched back on.
pub async fn admin_centers(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<Center>> {
    require_permission(&user, Permission::ManageCenters)?;
    let centers = state.repo.list_centers(None, true).await?;
    page(&locale, Some(&user), centers)
}

pub async fn admin_payments(
    AppPath(locale): AppPath<String>,
    user: AuthUser,
    State(state): State<AppState>,
) -> Page<Vec<Payment>> {
    require_permission(&user, Permission::ViewAllPayments)?;
    let payments = state.repo.list_payments(None).await?;
    page(&locale, Some(&user), payments)
}
