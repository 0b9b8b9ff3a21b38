//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Database (one of)
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `DB_HOST`, `DB_PORT`, `DB_NAME` - Composed into a connection string when
//!   `DATABASE_URL` is unset. The legacy deployment names `MONGO_HOST`,
//!   `MONGO_PORT` and `MONGO_DEFAULT_DATABASE` are accepted as fallbacks.
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 2222)
//! - `BASE_URL` - Public URL (default: `http://localhost:<PORT>`); `https://` enables secure cookies
//! - `IMAGES_DIR` - Directory for uploaded product images (default: images)
//! - `PUBLIC_DIR` - Directory for static assets (default: public)
//! - `PRODUCTS_PER_PAGE` - Catalog page size (default: 6)
//! - `CSRF_PROTECTION` - Require CSRF tokens on unsafe requests (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 2222;
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_PRODUCTS_PER_PAGE: u32 = 6;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shop application configuration.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// `PostgreSQL` database connection URL (may contain a password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the shop
    pub base_url: String,
    /// Directory uploaded product images are written to and served from
    pub images_dir: PathBuf,
    /// Directory of static assets served under `/public`
    pub public_dir: PathBuf,
    /// Number of products per catalog page
    pub products_per_page: u32,
    /// Whether unsafe requests must carry the session CSRF token
    pub csrf_protection: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ShopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database location is missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url_from_env()?;
        let host = parse_env("HOST", Some(IpAddr::from([0, 0, 0, 0])))?
            .unwrap_or(IpAddr::from([0, 0, 0, 0]));
        let port = parse_env("PORT", Some(DEFAULT_PORT))?.unwrap_or(DEFAULT_PORT);
        let base_url = get_optional_env("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let images_dir = PathBuf::from(get_env_or_default("IMAGES_DIR", "images"));
        let public_dir = PathBuf::from(get_env_or_default("PUBLIC_DIR", "public"));
        let products_per_page = parse_env("PRODUCTS_PER_PAGE", Some(DEFAULT_PRODUCTS_PER_PAGE))?
            .unwrap_or(DEFAULT_PRODUCTS_PER_PAGE);
        if products_per_page == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PRODUCTS_PER_PAGE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let csrf_protection = get_bool_env("CSRF_PROTECTION")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            images_dir,
            public_dir,
            products_per_page,
            csrf_protection,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Resolve the database URL from the environment.
///
/// Used by both the server and the CLI.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `DATABASE_URL` nor a host
/// and database name are set, or `InvalidEnvVar` for a malformed port.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    if let Some(url) = get_optional_env("DATABASE_URL") {
        return Ok(SecretString::from(url));
    }

    let host = env_with_fallback("DB_HOST", "MONGO_HOST")
        .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
    let name = env_with_fallback("DB_NAME", "MONGO_DEFAULT_DATABASE")
        .ok_or_else(|| ConfigError::MissingEnvVar("DB_NAME".to_string()))?;
    let port = match env_with_fallback("DB_PORT", "MONGO_PORT") {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("DB_PORT".to_string(), e.to_string()))?,
        None => DEFAULT_DB_PORT,
    };

    Ok(SecretString::from(compose_database_url(&host, port, &name)))
}

/// Build a `PostgreSQL` URL from its parts.
fn compose_database_url(host: &str, port: u16, database: &str) -> String {
    format!("postgres://{host}:{port}/{database}")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Read `primary`, falling back to the legacy variable name.
fn env_with_fallback(primary: &str, legacy: &str) -> Option<String> {
    get_optional_env(primary).or_else(|| get_optional_env(legacy))
}

/// Parse an optional environment variable, returning `default` when unset.
fn parse_env<T>(key: &str, default: Option<T>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`), default false.
fn get_bool_env(key: &str) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(false), |raw| parse_bool(key, &raw))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn sample_config() -> ShopConfig {
        ShopConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 2222,
            base_url: "http://localhost:2222".to_string(),
            images_dir: PathBuf::from("images"),
            public_dir: PathBuf::from("public"),
            products_per_page: 6,
            csrf_protection: false,
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = sample_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 2222);
    }

    #[test]
    fn test_secure_cookies_follow_base_url_scheme() {
        let mut config = sample_config();
        assert!(!config.secure_cookies());
        config.base_url = "https://shop.example.com".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_compose_database_url() {
        assert_eq!(
            compose_database_url("db.internal", 5433, "shop"),
            "postgres://db.internal:5433/shop"
        );
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", " YES ").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        let err = parse_bool("CSRF_PROTECTION", "maybe").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CSRF_PROTECTION"));
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let mut config = sample_config();
        config.database_url = SecretString::from("postgres://user:hunter2@db/shop");
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
        assert_eq!(
            config.database_url.expose_secret(),
            "postgres://user:hunter2@db/shop"
        );
    }
}
