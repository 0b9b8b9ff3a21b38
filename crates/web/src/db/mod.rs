//! Database access for the shop.
//!
//! # Tables
//!
//! - `users` - Accounts with argon2 password hashes and reset tokens
//! - `products` - Catalog, each row owned by the user who created it
//! - `cart_items` - One row per `(user_id, product_id)` with a quantity
//! - `orders` - Immutable order snapshots (updates rejected by a trigger)
//! - `tower_sessions.sessions` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```
//!
//! Handlers never hold a pool directly; they go through the [`Database`]
//! trait object stored in `AppState`.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::{Email, OrderId, ProductId, UserId};

use crate::models::{
    Cart, NewProduct, NewUser, Order, Page, PageRequest, Product, ProductChanges, User,
};

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be turned back into a domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store cannot be reached.
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

/// The shop's database-access object.
///
/// Owner-scoped product operations return `None` when the product does not
/// exist or belongs to someone else; callers cannot tell the two apart.
#[async_trait]
pub trait Database: Send + Sync {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Insert a user. Returns `Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Store a password reset token, replacing any earlier one.
    async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Find the user holding `token`, if it has not expired at `now`.
    async fn find_user_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError>;

    /// Replace the password hash and clear any reset token.
    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn create_product(
        &self,
        owner: UserId,
        product: NewProduct,
    ) -> Result<Product, RepositoryError>;

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// List products by ascending id, optionally only those owned by `owner`.
    async fn list_products(
        &self,
        owner: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError>;

    /// Apply `changes` to a product `owner` created. Returns the updated product.
    async fn update_product(
        &self,
        owner: UserId,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product `owner` created, along with every cart line that
    /// references it. Returns the removed product.
    async fn delete_product(
        &self,
        owner: UserId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    async fn cart(&self, user: UserId) -> Result<Cart, RepositoryError>;

    /// Add one unit of `product`, creating the line if needed.
    /// Returns `NotFound` if the product does not exist.
    async fn add_to_cart(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError>;

    /// Drop the whole line for `product`. Missing lines are ignored.
    async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Turn the user's cart into an order and empty the cart, atomically.
    /// Returns `None` without writing anything if the cart is empty.
    async fn place_order(&self, user: &User) -> Result<Option<Order>, RepositoryError>;

    /// The user's orders, newest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    /// Check the database answers.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Open the pool and wrap it in a [`PgDatabase`].
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the connection cannot be established.
pub async fn connect(database_url: &secrecy::SecretString) -> Result<PgDatabase, RepositoryError> {
    let pool = create_pool(database_url).await?;
    Ok(PgDatabase::new(pool))
}
