//! One-shot flash messages stored in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{FlashMessage, session_keys};

/// Store a message for the next rendered page, replacing any pending one.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_flash(
    session: &Session,
    message: FlashMessage,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::FLASH, message).await
}

/// Extractor that takes (and clears) the pending flash message.
///
/// Only page handlers should use it; the message is gone once extracted.
pub struct Flash(pub Option<FlashMessage>);

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };

        let message = session
            .remove::<FlashMessage>(session_keys::FLASH)
            .await?;
        Ok(Self(message))
    }
}
