use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::{Role, User},
    rbac::{self, Permission},
    repository::RepositoryState,
};

/// Name of the HttpOnly cookie carrying the session token for page requests.
pub const SESSION_COOKIE: &str = "session";

/// Header accepted in `Env::Local` to act as an existing user without a token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Claims
///
/// Payload of a session token. The role is informational for clients; the server always
/// re-reads the role from the database.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Used as an extractor by every
/// handler that needs a session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn can(&self, permission: Permission) -> bool {
        rbac::has_permission(self.role, permission)
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// require_permission
///
/// The handler-side RBAC check: 403 unless the caller's role holds `permission`.
pub fn require_permission(user: &AuthUser, permission: Permission) -> Result<(), ApiError> {
    if user.can(permission) {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.id, role = ?user.role, ?permission, "permission denied");
        Err(ApiError::Forbidden)
    }
}

// --- Passwords ---

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// --- Session tokens ---

pub fn issue_token(user: &User, config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id,
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.session_ttl_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

pub fn decode_token(token: &str, config: &AppConfig) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

/// Candidate session tokens: the Bearer header first, then the session cookie.
/// The scheme name is matched case-insensitively.
fn session_tokens(parts: &Parts) -> Vec<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty());

    let cookie = CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    bearer.into_iter().chain(cookie).collect()
}

/// resolve_session
///
/// Shared by the `AuthUser` / `MaybeAuthUser` extractors and the page guard.
///
/// 1. Reuses an identity already resolved earlier in the request (middleware).
/// 2. Local bypass via `x-user-id` (only in `Env::Local`).
/// 3. Bearer token, else session cookie: the first one that validates and has not expired.
/// 4. Database lookup: deleted users are rejected and the stored role wins.
///
/// `Ok(None)` means "anonymous"; `Err` is reserved for infrastructure failures.
pub async fn resolve_session(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<AuthUser>, ApiError> {
    if let Some(user) = parts.extensions.get::<AuthUser>() {
        return Ok(Some(user.clone()));
    }

    if config.env == Env::Local {
        let dev_user = parts
            .headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(user_id) = dev_user {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(AuthUser::from(&user)));
            }
        }
    }

    // A stale Authorization header must not hide a valid cookie.
    let Some(claims) = session_tokens(parts)
        .iter()
        .find_map(|token| decode_token(token, config))
    else {
        tracing::debug!("no valid session token on request");
        return Ok(None);
    };

    Ok(repo
        .get_user(claims.sub)
        .await?
        .map(|user| AuthUser::from(&user)))
}

/// AuthUser Extractor
///
/// Rejects with 401 when no valid session resolves.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_session(parts, &repo, &config)
            .await?
            .ok_or_else(ApiError::unauthenticated)
    }
}

/// MaybeAuthUser
///
/// Optional session for public pages. Never rejects for a missing or bad token.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        Ok(MaybeAuthUser(resolve_session(parts, &repo, &config).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Salma".into(),
            email: "salma@example.com".into(),
            phone: None,
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn tokens_round_trip_with_the_same_secret() {
        let config = AppConfig::default();
        let user = user(Role::Staff);
        let token = issue_token(&user, &config).unwrap();

        let claims = decode_token(&token, &config).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Staff);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let config = AppConfig::default();
        let token = issue_token(&user(Role::User), &config).unwrap();

        let other = AppConfig {
            jwt_secret: "another-secret".into(),
            ..AppConfig::default()
        };
        assert!(decode_token(&token, &other).is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = AppConfig::default();
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            iat: past.timestamp() as usize,
            exp: past.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(&token, &config).is_none());
    }

    #[test]
    fn require_permission_maps_to_forbidden() {
        let staff = AuthUser {
            id: Uuid::new_v4(),
            email: "staff@example.com".into(),
            role: Role::Staff,
        };
        assert!(require_permission(&staff, Permission::ManageBookings).is_ok());
        assert!(matches!(
            require_permission(&staff, Permission::ManageUsers),
            Err(ApiError::Forbidden)
        ));
    }
}
