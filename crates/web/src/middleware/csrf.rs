//! Optional CSRF protection (`CSRF_PROTECTION=true`).
//!
//! Each session gets one random token. Unsafe requests must echo it in the
//! `x-csrf-token` header, a `_csrf` query parameter (used by multipart forms),
//! or a `_csrf` field of a urlencoded body. Anything else is answered with 403.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, Method, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;
use crate::state::AppState;

/// Header carrying the token for scripted requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field / query parameter carrying the token.
pub const CSRF_FIELD: &str = "_csrf";

/// Largest urlencoded body buffered to look for the token.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Get the session's token, creating one on first use.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn session_token(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
        return Ok(token);
    }

    let token = generate_token();
    session.insert(session_keys::CSRF_TOKEN, &token).await?;
    Ok(token)
}

/// Middleware rejecting unsafe requests without the session token.
///
/// Does nothing unless CSRF protection is enabled in configuration.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if !state.config().csrf_protection || is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let expected = match session.get::<String>(session_keys::CSRF_TOKEN).await {
        Ok(token) => token,
        Err(e) => return AppError::from(e).into_response(),
    };

    let (request, provided) = match provided_token(request).await {
        Ok(found) => found,
        Err(e) => return e.into_response(),
    };

    match (expected, provided) {
        (Some(expected), Some(provided)) if tokens_match(&expected, &provided) => {
            next.run(request).await
        }
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected request with missing or invalid CSRF token");
            AppError::Forbidden("invalid CSRF token".to_string()).into_response()
        }
    }
}

fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

/// Find the token in the request, buffering a urlencoded body if needed.
/// The returned request carries the same body.
async fn provided_token(request: Request) -> Result<(Request, Option<String>), AppError> {
    if let Some(token) = header_token(request.headers()) {
        return Ok((request, Some(token)));
    }
    if let Some(token) = request.uri().query().and_then(query_token) {
        return Ok((request, Some(token)));
    }
    if !is_urlencoded(request.headers()) {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("form body too large".to_string()))?;
    let token = form_token(&bytes);

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn query_token(query: &str) -> Option<String> {
    form_token(query.as_bytes())
}

fn form_token(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn is_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, provided: &str) -> bool {
    expected.len() == provided.len()
        && expected
            .bytes()
            .zip(provided.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
