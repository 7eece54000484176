use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod locale;
pub mod mailer;
pub mod models;
pub mod pages;
pub mod rbac;
pub mod repository;
pub mod validation;

// Routing segregation (public, authenticated, admin, pages).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, pages as page_router, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use mailer::{HttpMailer, MailerState, MockMailer};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every `/api` handler, served at `/api-docs/openapi.json` and
/// browsable through Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::register, handlers::auth::login, handlers::auth::logout,
        handlers::auth::session, handlers::auth::forgot_password, handlers::auth::reset_password,
        handlers::cars::list_cars, handlers::cars::create_car, handlers::cars::delete_car,
        handlers::profile::get_profile, handlers::profile::update_profile,
        handlers::profile::change_password,
        handlers::centers::list_centers, handlers::centers::get_center,
        handlers::centers::list_slots,
        handlers::bookings::list_my_bookings, handlers::bookings::create_booking,
        handlers::bookings::get_booking, handlers::bookings::cancel_booking,
        handlers::payments::list_my_payments,
        handlers::admin::get_stats, handlers::admin::list_users, handlers::admin::update_user_role,
        handlers::admin::list_bookings, handlers::admin::update_booking_status,
        handlers::admin::create_center, handlers::admin::update_center,
        handlers::admin::create_slot, handlers::admin::list_payments,
        handlers::admin::update_payment_status
    ),
    components(
        schemas(
            error::ErrorBody, rbac::Permission,
            models::Role, models::FuelType, models::BookingStatus, models::PaymentStatus,
            models::UserProfile, models::Car, models::Center, models::TimeSlot,
            models::Booking, models::BookingDetails, models::Payment,
            models::RegisterRequest, models::LoginRequest, models::LoginResponse,
            models::ForgotPasswordRequest, models::ResetPasswordRequest,
            models::ChangePasswordRequest, models::UpdateProfileRequest,
            models::CreateCarRequest, models::CreateBookingRequest,
            models::CreateCenterRequest, models::UpdateCenterRequest,
            models::CreateTimeSlotRequest, models::UpdateRoleRequest,
            models::UpdateBookingStatusRequest, models::UpdatePaymentStatusRequest,
            models::SessionResponse, models::MessageResponse, models::BookingCount,
            models::AdminStats,
        )
    ),
    tags(
        (name = "inspection-booking", description = "Vehicle technical-inspection booking API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared state: repository, mailer and configuration. Cloned per request
/// (all members are cheap handles).
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (`PostgresRepository` in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Outgoing email (password reset links).
    pub mailer: MailerState,
    /// Configuration loaded at startup.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull only the slice of state they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Session layer for the authenticated and admin API routers. The `AuthUser` extractor
/// rejects with a 401 JSON error before the handler runs; on success the identity is
/// stored in the request extensions so the handler's own extractor reuses it.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles the whole routing table, the session and page guards, the locale fallback
/// and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(page_router::page_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::page_guard,
        )))
        // Root redirect, unknown locales and everything else nobody claimed.
        .fallback(guard::locale_fallback)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`: method, uri and the `x-request-id` set by the layer above, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
