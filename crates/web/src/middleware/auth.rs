//! Authentication middleware and extractors.
//!
//! [`load_current_user`] resolves the session's user once per request and
//! stores it in request extensions; the extractors read it from there.

use std::ops::Deref;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::models::{SessionUser, User, session_keys};
use crate::state::AppState;

/// The authenticated user for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Arc<User>);

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Middleware that attaches the session's user to the request.
///
/// - No user in the session: the request continues anonymously.
/// - User found: a [`CurrentUser`] is added to request extensions.
/// - User no longer exists: the session is flushed and the request continues
///   anonymously.
/// - Lookup fails: the request ends with the server error page.
pub async fn load_current_user(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, &session).await {
        Ok(Some(user)) => {
            set_sentry_user(&user.id, Some(user.email.as_str()));
            request.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(e) => return e.into_response(),
    }

    next.run(request).await
}

async fn resolve_user(state: &AppState, session: &Session) -> Result<Option<CurrentUser>, AppError> {
    let Some(session_user) = session.get::<SessionUser>(session_keys::USER).await? else {
        return Ok(None);
    };

    match state.db().find_user(session_user.id).await? {
        Some(user) => Ok(Some(CurrentUser(Arc::new(user)))),
        None => {
            tracing::warn!(
                user_id = %session_user.id,
                "Session references a deleted user, logging out"
            );
            session.flush().await?;
            Ok(None)
        }
    }
}

/// Extractor that requires a logged-in user.
///
/// If nobody is logged in, the request is redirected to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Rejection for [`RequireUser`].
#[derive(Debug)]
pub struct LoginRequired;

impl IntoResponse for LoginRequired {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = LoginRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(Self)
            .ok_or(LoginRequired)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, this does not reject the request if nobody is logged in.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

/// Log `user` in on this session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn start_user_session(
    session: &Session,
    user: &User,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(
            session_keys::USER,
            SessionUser {
                id: user.id,
                email: user.email.clone(),
            },
        )
        .await?;
    session.insert(session_keys::IS_LOGGED_IN, true).await
}

/// Destroy the session (logout).
///
/// # Errors
///
/// Returns an error if the session record cannot be deleted.
pub async fn end_user_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
