//! Page-route guard and the locale-aware fallback.
//!
//! Page routes are mounted as `/{locale}/...`. The guard rejects unsupported locale
//! segments, then applies the [`rbac::route_rule`] of the locale-stripped path:
//! anonymous visitors are sent to sign in, under-privileged ones to the unauthorized
//! page. Requests that match no route at all go through [`locale_fallback`].

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Uri, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use url::form_urlencoded;

use crate::{
    AppState,
    auth::resolve_session,
    error::ApiError,
    locale::{self, LOCALE_COOKIE, Locale},
    rbac::{self, RouteRule},
};

fn negotiated_locale(headers: &HeaderMap) -> Locale {
    let jar = CookieJar::from_headers(headers);
    locale::negotiate(
        jar.get(LOCALE_COOKIE).map(|c| c.value()),
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}

fn page_not_found() -> Response {
    ApiError::not_found("Page not found").into_response()
}

/// reroute
///
/// Decides what happens to a request whose first segment is not a supported locale,
/// or that matched no route:
/// - `/` redirects to the negotiated locale home.
/// - `/api/...` is a JSON 404.
/// - a supported locale with an unknown page is a 404.
/// - a two-letter segment that is not a supported locale is a 404.
/// - anything else is redirected under the negotiated locale, query preserved.
fn reroute(uri: &Uri, headers: &HeaderMap) -> Response {
    let path = uri.path();

    if path.is_empty() || path == "/" {
        let target = format!("/{}", negotiated_locale(headers).as_str());
        return Redirect::temporary(&target).into_response();
    }

    if path == "/api" || path.starts_with("/api/") {
        return ApiError::not_found(format!("No API route for {path}")).into_response();
    }

    match locale::split_locale(path) {
        (Some(segment), _) if Locale::from_segment(segment).is_some() => page_not_found(),
        (Some(segment), _) if locale::looks_like_locale(segment) => {
            tracing::debug!(%segment, "unsupported locale requested");
            page_not_found()
        }
        _ => {
            let locale = negotiated_locale(headers);
            let target = match uri.query() {
                Some(query) => format!("/{}{}?{}", locale.as_str(), path, query),
                None => format!("/{}{}", locale.as_str(), path),
            };
            Redirect::temporary(&target).into_response()
        }
    }
}

/// locale_fallback
///
/// Router fallback: everything no route claimed.
pub async fn locale_fallback(request: Request) -> Response {
    reroute(request.uri(), request.headers())
}

fn signin_redirect(locale: Locale, uri: &Uri) -> Response {
    let original = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let callback: String = form_urlencoded::byte_serialize(original.as_bytes()).collect();

    Redirect::temporary(&format!(
        "/{}/auth/signin?callbackUrl={}",
        locale.as_str(),
        callback
    ))
    .into_response()
}

/// page_guard
///
/// [Page Middleware] Enforces the route table before any page loader runs. On success the
/// resolved `AuthUser` is stored in the request extensions, so the loader's extractor
/// does not resolve the session a second time.
pub async fn page_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let (segment, rest) = locale::split_locale(&path);
    let Some(locale) = segment.and_then(Locale::from_segment) else {
        return reroute(&parts.uri, &parts.headers);
    };

    let rule = rbac::route_rule(rest);
    if rule == RouteRule::Public {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let user = match resolve_session(&parts, &state.repo, &state.config).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(%path, "anonymous visitor sent to sign-in");
            return signin_redirect(locale, &parts.uri);
        }
        Err(e) => return e.into_response(),
    };

    if !rbac::allows(user.role, rule) {
        tracing::warn!(user_id = %user.id, role = ?user.role, %path, "page access denied");
        return Redirect::temporary(&format!("/{}/unauthorized", locale.as_str())).into_response();
    }

    parts.extensions.insert(user);
    next.run(Request::from_parts(parts, body)).await
}
