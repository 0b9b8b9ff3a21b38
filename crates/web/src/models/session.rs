//! Session-related types.
//!
//! Types stored in the session for authentication state and one-shot messages.

use serde::{Deserialize, Serialize};

use emporium_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user. The full
/// user is re-loaded from the database on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address at login time.
    pub email: Email,
}

/// Flash message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub text: String,
}

impl FlashMessage {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    /// Whether this is an error message (templates pick the CSS class with it).
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == FlashKind::Error
    }
}

/// Session keys.
pub mod keys {
    /// Key for the logged-in [`super::SessionUser`].
    pub const USER: &str = "user";

    /// Key for the login flag shown to templates.
    pub const IS_LOGGED_IN: &str = "is_logged_in";

    /// Key for the pending [`super::FlashMessage`].
    pub const FLASH: &str = "flash";

    /// Key for the per-session CSRF token.
    pub const CSRF_TOKEN: &str = "csrf_token";
}
