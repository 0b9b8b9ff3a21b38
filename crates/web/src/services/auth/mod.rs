//! Authentication service.
//!
//! Provides password signup, login and the password reset flow.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use emporium_core::{Email, UserId};

use crate::db::{Database, RepositoryError};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password reset link stays valid.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Authentication service.
///
/// Handles user registration, login, and password resets.
pub struct AuthService<'a> {
    db: &'a dyn Database,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a dyn Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password, confirm_password)?;

        if self.db.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .db
            .create_user(NewUser {
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .db
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        Ok(user)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset token for `email`, valid for one hour.
    ///
    /// Returns `None` for unknown addresses so callers can respond identically
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn request_password_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(User, String)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(user) = self.db.find_user_by_email(&email).await? else {
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = now + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.db.set_reset_token(user.id, &token, expires_at).await?;

        Ok(Some((user, token)))
    }

    /// Look up the user a reset link belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    pub async fn user_for_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        self.db
            .find_user_by_reset_token(token, now)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Set a new password using a reset token. The token is consumed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidResetToken` if the token is unknown, expired
    /// or was issued to another user, and the password errors of [`Self::signup`].
    pub async fn reset_password(
        &self,
        user_id: UserId,
        token: &str,
        password: &str,
        confirm_password: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let user = self.user_for_reset_token(token, now).await?;
        if user.id != user_id {
            return Err(AuthError::InvalidResetToken);
        }

        validate_password(password, confirm_password)?;
        let password_hash = hash_password(password)?;
        self.db.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str, confirm_password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    if password != confirm_password {
        return Err(AuthError::PasswordMismatch);
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// 256 random bits, URL-safe.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::MemoryDatabase;

    use super::*;

    const PASSWORD: &str = "correct horse";

    async fn signed_up(db: &MemoryDatabase) -> User {
        AuthService::new(db)
            .signup("Shopper@Example.com", PASSWORD, PASSWORD)
            .await
            .unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password(PASSWORD).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(PASSWORD, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(matches!(
            validate_password("short", "short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("long enough", "long enougH"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(validate_password("long enough", "long enough").is_ok());
    }

    #[test]
    fn test_reset_tokens_are_unique_and_url_safe() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_signup_normalizes_email_and_hashes_password() {
        let db = MemoryDatabase::new();
        let user = signed_up(&db).await;
        assert_eq!(user.email.as_str(), "shopper@example.com");
        assert_ne!(user.password_hash, PASSWORD);
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_email() {
        let db = MemoryDatabase::new();
        signed_up(&db).await;
        let err = AuthService::new(&db)
            .signup("shopper@example.com", PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_signup_rejects_invalid_email() {
        let db = MemoryDatabase::new();
        let err = AuthService::new(&db)
            .signup("not-an-email", PASSWORD, PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn test_login() {
        let db = MemoryDatabase::new();
        let user = signed_up(&db).await;
        let auth = AuthService::new(&db);

        let logged_in = auth.login(" SHOPPER@example.com ", PASSWORD).await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("shopper@example.com", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", PASSWORD).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_surfaces_database_failure() {
        let db = MemoryDatabase::new();
        signed_up(&db).await;
        db.set_unavailable(true);
        let err = AuthService::new(&db)
            .login("shopper@example.com", PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Repository(_)));
        assert!(!err.is_user_error());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let db = MemoryDatabase::new();
        let user = signed_up(&db).await;
        let auth = AuthService::new(&db);
        let now = Utc::now();

        let (reset_user, token) = auth
            .request_password_reset("shopper@example.com", now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reset_user.id, user.id);
        assert_eq!(auth.user_for_reset_token(&token, now).await.unwrap().id, user.id);

        auth.reset_password(user.id, &token, "brand new pass", "brand new pass", now)
            .await
            .unwrap();
        assert!(auth.login("shopper@example.com", "brand new pass").await.is_ok());
        assert!(auth.login("shopper@example.com", PASSWORD).await.is_err());

        // Single use
        assert!(matches!(
            auth.reset_password(user.id, &token, "another pass 1", "another pass 1", now)
                .await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_token_expires_after_an_hour() {
        let db = MemoryDatabase::new();
        signed_up(&db).await;
        let auth = AuthService::new(&db);
        let now = Utc::now();

        let (_, token) = auth
            .request_password_reset("shopper@example.com", now)
            .await
            .unwrap()
            .unwrap();
        let later = now + Duration::minutes(61);
        assert!(matches!(
            auth.user_for_reset_token(&token, later).await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_rejects_other_user_id() {
        let db = MemoryDatabase::new();
        let user = signed_up(&db).await;
        let auth = AuthService::new(&db);
        let now = Utc::now();
        let (_, token) = auth
            .request_password_reset("shopper@example.com", now)
            .await
            .unwrap()
            .unwrap();

        let other = UserId::new(user.id.as_i32() + 1);
        assert!(matches!(
            auth.reset_password(other, &token, "brand new pass", "brand new pass", now)
                .await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_for_unknown_email_is_silent() {
        let db = MemoryDatabase::new();
        let auth = AuthService::new(&db);
        assert!(
            auth.request_password_reset("ghost@example.com", Utc::now())
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            auth.request_password_reset("garbage", Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }
}
