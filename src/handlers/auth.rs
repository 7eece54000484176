use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use cookie::time::Duration as CookieDuration;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, SESSION_COOKIE, hash_password, issue_token, verify_password},
    config::Env,
    error::{ApiError, AppJson, ErrorBody},
    locale::{self, LOCALE_COOKIE, Locale},
    mailer::EmailMessage,
    models::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, NewUser,
        RegisterRequest, ResetPasswordRequest, Role, SessionResponse, UserProfile,
    },
    rbac,
    validation,
};

/// Lifetime of a password reset link.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Answer to every well-formed forgot-password request, whether or not the account exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent";

fn session_cookie(token: String, state: &AppState) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.config.env == Env::Production);
    cookie.set_max_age(CookieDuration::hours(state.config.session_ttl_hours));
    cookie
}

/// register
///
/// [Public Route] Creates a USER account. Emails are stored lowercased.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserProfile),
        (status = 400, description = "Invalid input or email taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let name = validation::required(&payload.name, "Name")?;
    let email = payload.email.trim().to_lowercase();
    if !validation::is_valid_email(&email) {
        return Err(ApiError::validation("A valid email address is required"));
    }
    validation::validate_password(&payload.password)?;

    let user = state
        .repo
        .create_user(NewUser {
            name,
            email,
            phone: validation::optional_text(payload.phone),
            password_hash: hash_password(&payload.password)?,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, "account registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login
///
/// [Public Route] Exchanges credentials for a session token, returned in the body and
/// as an HttpOnly `session` cookie. Unknown email and wrong password answer identically.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let email = payload.email.trim().to_lowercase();
    let user = state
        .repo
        .get_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid());
    }

    let token = issue_token(&user, &state.config)?;
    let jar = jar.add(session_cookie(token.clone(), &state));

    tracing::info!(user_id = %user.id, role = ?user.role, "signed in");
    Ok((
        jar,
        Json(LoginResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Tokens are stateless and simply expire.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));

    // An expired cookie is sent even when the request carried none.
    (jar.add(removal), StatusCode::NO_CONTENT)
}

/// session
///
/// [Authenticated Route] The session as seen by client hooks: profile, effective
/// permissions and whether the back-office entry should be shown.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn session(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let profile = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    Ok(Json(SessionResponse {
        permissions: rbac::permissions_for(profile.role).to_vec(),
        can_access_admin: rbac::can_access_admin(profile.role),
        user: profile.into(),
    }))
}

/// forgot_password
///
/// [Public Route] Starts a password reset.
///
/// *Non-enumeration*: once the email is well-formed the answer is always the same 200,
/// whether the account exists or the mail could be delivered. Delivery failures are
/// logged only.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
        (status = 400, description = "Missing or malformed email", body = ErrorBody)
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if !validation::is_valid_email(&email) {
        return Err(ApiError::validation("A valid email address is required"));
    }

    let locale = payload
        .locale
        .as_deref()
        .and_then(Locale::parse)
        .unwrap_or_else(|| {
            locale::negotiate(
                jar.get(LOCALE_COOKIE).map(|c| c.value()),
                headers
                    .get(header::ACCEPT_LANGUAGE)
                    .and_then(|v| v.to_str().ok()),
            )
        });

    // The lookup and the mail API call run off the request path, so known and unknown
    // addresses answer in the same time.
    tokio::spawn(async move {
        if let Err(e) = send_reset_link(&state, &email, locale).await {
            tracing::error!(error = %e, "password reset request failed");
        }
    });

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

async fn send_reset_link(state: &AppState, email: &str, locale: Locale) -> Result<(), ApiError> {
    let Some(user) = state.repo.get_user_by_email(email).await? else {
        tracing::info!("password reset requested for an unknown email");
        return Ok(());
    };

    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    let token = state.repo.create_reset_token(user.id, expires_at).await?;
    let link = format!(
        "{}/{}/auth/reset-password?token={}",
        state.config.app_base_url.trim_end_matches('/'),
        locale.as_str(),
        token
    );

    let message = EmailMessage {
        to: user.email.clone(),
        subject: "Reset your password".to_string(),
        text: format!(
            "Hello {},\n\nUse the link below to choose a new password. It expires in one hour.\n\n{}\n\nIf you did not ask for this, you can ignore this email.",
            user.name, link
        ),
    };

    match state.mailer.send(message).await {
        Ok(()) => tracing::info!(user_id = %user.id, "password reset email sent"),
        Err(e) => tracing::error!(user_id = %user.id, error = %e, "password reset email failed"),
    }
    Ok(())
}

/// reset_password
///
/// [Public Route] Completes a reset with the emailed token. Tokens are single use.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid token or password", body = ErrorBody)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let invalid_token = || ApiError::validation("This reset link is invalid or has expired");

    let token = Uuid::parse_str(payload.token.trim()).map_err(|_| invalid_token())?;
    validation::validate_password(&payload.password)?;

    let password_hash = hash_password(&payload.password)?;
    if !state
        .repo
        .consume_reset_token(token, &password_hash, Utc::now())
        .await?
    {
        return Err(invalid_token());
    }

    tracing::info!("password reset completed");
    Ok(Json(MessageResponse::new("Your password has been reset")))
}
