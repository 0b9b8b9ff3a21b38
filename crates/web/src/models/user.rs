//! User domain types.

use core::fmt;

use chrono::{DateTime, Utc};

use emporium_core::{Email, UserId};

/// A registered shop user.
///
/// Every user can browse, buy, and manage the products they created.
#[derive(Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address (unique).
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Outstanding password reset token, if one was requested.
    pub reset_token: Option<String>,
    /// When `reset_token` stops being accepted.
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether `token` is this user's reset token and has not expired at `now`.
    #[must_use]
    pub fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires_at) {
            (Some(stored), Some(expires_at)) => stored == token && expires_at > now,
            _ => false,
        }
    }
}

// Hand-written so password hashes and reset tokens never reach logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("reset_token", &self.reset_token.as_ref().map(|_| "[REDACTED]"))
            .field("reset_token_expires_at", &self.reset_token_expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Data needed to insert a user.
#[derive(Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
}
