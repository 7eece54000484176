use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{AuthUser, hash_password, verify_password},
    error::{ApiError, AppJson, ErrorBody},
    models::{ChangePasswordRequest, MessageResponse, UpdateProfileRequest, UserProfile},
    validation,
};

/// get_profile
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn get_profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .repo
        .get_user(user.id)
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// update_profile
///
/// [Authenticated Route] Partial update of name and phone. An empty phone is ignored;
/// a blank name is rejected.
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Blank name", body = ErrorBody)
    )
)]
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(|name| validation::required(name, "Name"))
        .transpose()?;
    let phone = validation::optional_text(payload.phone);

    state
        .repo
        .update_profile(user.id, name, phone)
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// change_password
///
/// [Authenticated Route] Replaces the caller's password after re-checking the current one.
#[utoipa::path(
    patch,
    path = "/api/profile/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields, weak password or wrong current password", body = ErrorBody),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 404, description = "Account no longer exists", body = ErrorBody)
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::validation(
            "Current password and new password are required",
        ));
    }
    validation::validate_password(&payload.new_password)?;
    if payload.current_password == payload.new_password {
        return Err(ApiError::validation(
            "The new password must differ from the current one",
        ));
    }

    let account = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(&payload.current_password, &account.password_hash) {
        tracing::warn!(user_id = %user.id, "password change rejected: wrong current password");
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let password_hash = hash_password(&payload.new_password)?;
    if !state.repo.update_password(user.id, &password_hash).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
