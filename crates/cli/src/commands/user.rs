//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! emporium-cli user create -e admin@example.com -p 'correct horse battery'
//! ```
//!
//! Any user can manage their own products under `/admin`, so this is also how
//! the first admin account is made.

use emporium_web::config::{ConfigError, database_url_from_env};
use emporium_web::db::{self, RepositoryError};
use emporium_web::services::{AuthError, AuthService};
use thiserror::Error;

/// Errors that can occur while creating a user.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] RepositoryError),

    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a user with `email` and `password`.
///
/// Applies the same rules as the signup form.
///
/// # Errors
///
/// Returns an error if the email is invalid or taken, the password is too
/// short, or the database is unreachable.
pub async fn create(email: &str, password: &str) -> Result<(), UserError> {
    dotenvy::dotenv().ok();
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let database = db::connect(&database_url).await?;

    let user = AuthService::new(&database)
        .signup(email, password, password)
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User created");
    Ok(())
}
