//! Authentication middleware that validates the auth cookie, slides its expiry, and redirects guests to the log-in page.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE, response},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::Duration;

use crate::{
    AppState,
    auth::{
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::{build_log_in_redirect_url, build_log_in_redirect_url_from_target},
    },
    endpoints,
    timezone::get_local_offset,
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Where a guest is sent to log in, with the page they asked for as the redirect target.
///
/// POST routes under `/api` take the page that made the HTMX request from the `HX-Current-URL`
/// header. When that is missing, or the URI cannot be used as a target, the guest is sent
/// back to the points page after logging in.
fn log_in_redirect_for(request: &Request) -> String {
    build_log_in_redirect_url(request).unwrap_or_else(|| {
        let path = request.uri().path();

        if path.starts_with("/api") {
            tracing::warn!(
                "No usable HX-Current-URL header for {path}. Falling back to the points page."
            );
        } else {
            tracing::warn!("Could not use {path} as a redirect target. Falling back to the points page.");
        }

        build_log_in_redirect_url_from_target(endpoints::LEDGER_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    })
}

/// Copy the `Set-Cookie` headers of `jar` onto the outgoing response.
fn append_cookie_headers(jar: PrivateCookieJar, parts: &mut response::Parts) {
    let jar_response = jar.into_response();

    for value in jar_response.headers().get_all(SET_COOKIE) {
        parts.headers.append(SET_COOKIE, value.to_owned());
    }
}

/// Check the auth cookie, run the request as the member it names, then slide the cookie's
/// expiry forward by [AuthState::cookie_duration].
///
/// Guests, and members whose cookie is invalid or expired, get the response from
/// `get_redirect` with the log-in URL instead.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = log_in_redirect_for(&request);

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!(
            "Invalid timezone \"{}\". Redirecting to log in page.",
            state.local_timezone
        );
        return get_redirect(&log_in_redirect_url);
    };

    let (mut request_parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut request_parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };
    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(error) => {
            tracing::debug!("Rejected auth token: {error}");
            return get_redirect(&log_in_redirect_url);
        }
    };

    request_parts.extensions.insert(user_id);
    let response = next.run(Request::from_parts(request_parts, body)).await;

    let (mut response_parts, body) = response.into_parts();
    let jar = extend_auth_cookie_duration_if_needed(jar.clone(), state.cookie_duration, local_offset)
        .unwrap_or_else(|err| {
            tracing::error!(
                "Could not extend the session of user {user_id}: {err:?}. Keeping the old cookie."
            );
            jar
        });
    append_cookie_headers(jar, &mut response_parts);

    Response::from_parts(response_parts, body)
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a redirect to the log-in page is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid authorization cookie.
/// The user ID is placed into request and then the request executed normally if the cookie is valid, otherwise a HTMX redirect to the log-in page is returned.
///
/// Use this for the POST routes behind HTMX forms, since a plain redirect would be swapped into the form's target.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
