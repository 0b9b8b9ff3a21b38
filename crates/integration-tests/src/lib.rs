//! Integration tests for Emporium.
//!
//! Every test drives the full router in-process through `axum-test`, backed
//! by the in-memory database, an in-memory session store and temporary
//! directories for images and static files. No external services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum_test::{TestResponse, TestServer};
use emporium_core::{Email, Price, UserId};
use emporium_web::config::ShopConfig;
use emporium_web::db::{Database, MemoryDatabase};
use emporium_web::models::{NewProduct, NewUser, Product, User};
use emporium_web::services::auth::hash_password;
use emporium_web::state::AppState;
use secrecy::SecretString;
use tempfile::TempDir;
use tower_sessions::MemoryStore;

/// Password used by [`TestApp::create_user`].
pub const PASSWORD: &str = "correct horse battery";

/// A running app plus handles on its storage.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<MemoryDatabase>,
    pub images: TempDir,
    _public: TempDir,
}

impl TestApp {
    /// App with default settings (CSRF protection off).
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories or server cannot be created.
    pub fn new() -> anyhow::Result<Self> {
        Self::build(false)
    }

    /// App with CSRF protection on.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directories or server cannot be created.
    pub fn with_csrf() -> anyhow::Result<Self> {
        Self::build(true)
    }

    fn build(csrf_protection: bool) -> anyhow::Result<Self> {
        let images = tempfile::tempdir()?;
        let public = tempfile::tempdir()?;

        let config = ShopConfig {
            database_url: SecretString::from("postgres://unused/test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 2222,
            base_url: "http://localhost:2222".to_string(),
            images_dir: images.path().to_path_buf(),
            public_dir: public.path().to_path_buf(),
            products_per_page: 2,
            csrf_protection,
            sentry_dsn: None,
        };

        let db = Arc::new(MemoryDatabase::new());
        let state = AppState::new(config, db.clone());

        let mut server = TestServer::new(emporium_web::app(state, MemoryStore::default()))?;
        server.save_cookies();

        Ok(Self {
            server,
            db,
            images,
            _public: public,
        })
    }

    /// Insert a user with [`PASSWORD`] directly into the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is invalid or already taken.
    pub async fn create_user(&self, email: &str) -> anyhow::Result<User> {
        let user = self
            .db
            .create_user(NewUser {
                email: Email::parse(email)?,
                password_hash: hash_password(PASSWORD)?,
            })
            .await?;
        Ok(user)
    }

    /// Post the login form.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/login")
            .form(&[("email", email), ("password", password)])
            .await
    }

    /// Create a user and log the test client in as them.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be created or login does not redirect.
    pub async fn logged_in_user(&self, email: &str) -> anyhow::Result<User> {
        let user = self.create_user(email).await?;
        let response = self.login(email, PASSWORD).await;
        anyhow::ensure!(
            response.status_code().is_redirection(),
            "login failed with {}",
            response.status_code()
        );
        Ok(user)
    }

    /// Insert a product owned by `owner` directly into the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the price is invalid or the owner does not exist.
    pub async fn create_product(
        &self,
        owner: UserId,
        title: &str,
        price: &str,
    ) -> anyhow::Result<Product> {
        let product = self
            .db
            .create_product(
                owner,
                NewProduct {
                    title: title.to_string(),
                    price: Price::parse(price)?,
                    description: format!("All about {title}."),
                    image: format!("{}.png", title.to_lowercase().replace(' ', "-")),
                },
            )
            .await?;
        Ok(product)
    }

    /// File names currently in the images directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn stored_images(&self) -> anyhow::Result<Vec<String>> {
        let mut names = std::fs::read_dir(self.images.path())?
            .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &TestResponse) -> String {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok().map(str::to_owned))
        .unwrap_or_default()
}
