//! Per-request navigation state handed to every template.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::auth::CurrentUser;
use super::csrf;
use crate::error::AppError;
use crate::models::{SessionUser, session_keys};
use crate::state::AppState;

/// What the page chrome needs to know about the visitor.
#[derive(Debug, Clone, Default)]
pub struct ViewContext {
    /// The session is logged in and its user still exists.
    pub is_authenticated: bool,
    /// Shown in the navigation bar when logged in.
    pub user_email: Option<String>,
    /// Token to embed in forms when CSRF protection is on.
    pub csrf_token: Option<String>,
}

impl ViewContext {
    /// Build the context for a request that went through user resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or the CSRF token
    /// cannot be stored.
    pub async fn for_request(
        session: &Session,
        user: Option<&CurrentUser>,
        csrf_enabled: bool,
    ) -> Result<Self, tower_sessions::session::Error> {
        let logged_in = session
            .get::<bool>(session_keys::IS_LOGGED_IN)
            .await?
            .unwrap_or(false);

        let is_authenticated = logged_in && user.is_some();
        let csrf_token = if csrf_enabled {
            Some(csrf::session_token(session).await?)
        } else {
            None
        };

        Ok(Self {
            is_authenticated,
            user_email: user
                .filter(|_| is_authenticated)
                .map(|u| u.email.to_string()),
            csrf_token,
        })
    }

    /// Best-effort context for error pages rendered before user resolution
    /// finished. Uses only what the session itself says.
    pub async fn for_error_page(session: &Session) -> Self {
        let logged_in = session
            .get::<bool>(session_keys::IS_LOGGED_IN)
            .await
            .ok()
            .flatten()
            .unwrap_or(false);
        let user = session
            .get::<SessionUser>(session_keys::USER)
            .await
            .ok()
            .flatten();
        let csrf_token = session
            .get::<String>(session_keys::CSRF_TOKEN)
            .await
            .ok()
            .flatten();

        Self {
            is_authenticated: logged_in,
            user_email: user.filter(|_| logged_in).map(|u| u.email.to_string()),
            csrf_token,
        }
    }
}

/// Middleware that computes the [`ViewContext`] and stores it in both the
/// request (for handlers) and the response (for error page rendering).
pub async fn view_context_middleware(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let user = request.extensions().get::<CurrentUser>().cloned();
    let view = match ViewContext::for_request(
        &session,
        user.as_ref(),
        state.config().csrf_protection,
    )
    .await
    {
        Ok(view) => view,
        Err(e) => return AppError::from(e).into_response(),
    };

    request.extensions_mut().insert(view.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(view);
    response
}

impl<S> FromRequestParts<S> for ViewContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_default())
    }
}
