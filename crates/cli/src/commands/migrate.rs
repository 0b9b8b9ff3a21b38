//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! emporium-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string, or `DB_HOST`, `DB_PORT`
//!   and `DB_NAME` to compose one
//!
//! # Migration Files
//!
//! Shop migrations live in `crates/web/migrations/`. The session table is
//! created by the session store's own migration.

use emporium_web::config::{ConfigError, database_url_from_env};
use emporium_web::db;
use emporium_web::middleware::session::{SessionStoreError, postgres_store};
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    SessionStore(#[from] SessionStoreError),
}

/// Run shop migrations, then the session store's.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running shop migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Running session store migration...");
    postgres_store(pool)?.migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
