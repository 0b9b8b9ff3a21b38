//! Session middleware configuration.
//!
//! Sessions are persisted by tower-sessions. Production uses the
//! `PostgreSQL` store in the shop database; tests plug in any other
//! `SessionStore`.

use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "emporium_session";

/// Table holding session records.
pub const SESSION_TABLE: &str = "sessions";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The session store rejected its table configuration.
#[derive(Debug, Error)]
#[error("invalid session store configuration: {0}")]
pub struct SessionStoreError(String);

/// Build the `PostgreSQL` session store on the shared pool.
///
/// # Errors
///
/// Returns `SessionStoreError` if the table name is rejected by the store.
pub fn postgres_store(pool: PgPool) -> Result<PostgresStore, SessionStoreError> {
    PostgresStore::new(pool)
        .with_table_name(SESSION_TABLE)
        .map_err(SessionStoreError)
}

/// Create the session layer for `store`.
///
/// # Arguments
///
/// * `store` - Session persistence backend
/// * `secure` - Mark the cookie `Secure` (the public URL is https)
#[must_use]
pub fn create_session_layer<S>(store: S, secure: bool) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
