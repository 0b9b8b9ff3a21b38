//! `PostgreSQL`-backed [`Database`] implementation.
//!
//! Queries are plain runtime `sqlx::query_as` calls decoding into the row
//! types below, which are then converted into domain models.
//!
//! ## Error Mapping
//!
//! | SQLx error | `RepositoryError` | Scenario |
//! |------------|-------------------|----------|
//! | unique violation (`23505`) | `Conflict` | Email already registered |
//! | foreign key violation (`23503`) | `NotFound` | Cart line for a missing product |
//! | `PoolTimedOut` / `PoolClosed` / `Io` | `Unavailable` | Database unreachable |
//! | anything else | `Database` | |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use emporium_core::{Email, OrderId, Price, ProductId, UserId};

use super::{Database, RepositoryError};
use crate::models::{
    Cart, CartLine, NewProduct, NewUser, Order, OrderItem, Page, PageRequest, Product,
    ProductChanges, User,
};

const USER_COLUMNS: &str =
    "id, email, password_hash, reset_token, reset_token_expires_at, created_at";
const PRODUCT_COLUMNS: &str = "id, owner_id, title, price, description, image";
const ORDER_COLUMNS: &str = "id, user_id, user_email, items, created_at";

/// Cart lines joined with their products, oldest line first.
const CART_QUERY: &str = r"
    SELECT p.id, p.owner_id, p.title, p.price, p.description, p.image, c.quantity
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY c.added_at, p.id
";

// =============================================================================
// Row Types
// =============================================================================

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    password_hash: String,
    reset_token: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            password_hash: row.password_hash,
            reset_token: row.reset_token,
            reset_token_expires_at: row.reset_token_expires_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: ProductId,
    owner_id: UserId,
    title: String,
    price: Price,
    description: String,
    image: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            price: row.price,
            description: row.description,
            image: row.image,
        }
    }
}

#[derive(FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    product: ProductRow,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid cart quantity: {}", row.quantity))
        })?;

        Ok(Self {
            product: row.product.into(),
            quantity,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    user_email: String,
    items: Json<Vec<OrderItem>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let user_email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            user_email,
            items: row.items.0,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// PgDatabase
// =============================================================================

/// Production database backed by a shared `PgPool`.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool (the session store shares it).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translate driver errors into repository errors.
fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            RepositoryError::Conflict(db_err.message().to_owned())
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            RepositoryError::NotFound
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Unavailable(e.to_string())
        }
        other => RepositoryError::Database(other),
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl Database for PgDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            RepositoryError::Conflict(_) => {
                RepositoryError::Conflict("email already exists".to_owned())
            }
            other => other,
        })?;

        row.try_into()
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(User::try_from).transpose()
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_user_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token = $1 AND reset_token_expires_at > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(User::try_from).transpose()
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users \
             SET password_hash = $2, reset_token = NULL, reset_token_expires_at = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn create_product(
        &self,
        owner: UserId,
        product: NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products (owner_id, title, price, description, image) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(owner)
        .bind(&product.title)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.image)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Product::from))
    }

    async fn list_products(
        &self,
        owner: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE ($1::int4 IS NULL OR owner_id = $1)",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::int4 IS NULL OR owner_id = $1) \
             ORDER BY id LIMIT $2 OFFSET $3"
        ))
        .bind(owner)
        .bind(to_i64(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = rows.into_iter().map(Product::from).collect();
        Ok(Page::new(items, page, u64::try_from(total).unwrap_or(0)))
    }

    async fn update_product(
        &self,
        owner: UserId,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE products \
             SET title = $3, price = $4, description = $5, image = COALESCE($6, image) \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&changes.title)
        .bind(changes.price)
        .bind(&changes.description)
        .bind(changes.image.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Product::from))
    }

    async fn delete_product(
        &self,
        owner: UserId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        // cart_items rows go with it via ON DELETE CASCADE
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "DELETE FROM products WHERE id = $1 AND owner_id = $2 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Product::from))
    }

    async fn cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(CART_QUERY)
            .bind(user)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cart { lines })
    }

    async fn add_to_cart(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, 1) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = cart_items.quantity + 1",
        )
        .bind(user)
        .bind(product)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn place_order(&self, user: &User) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Lock the cart rows so a concurrent checkout cannot order them twice
        let rows: Vec<CartLineRow> = sqlx::query_as(&format!("{CART_QUERY} FOR UPDATE OF c"))
            .bind(user.id)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        }

        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let items: Vec<OrderItem> = lines.iter().map(OrderItem::from).collect();

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (user_id, user_email, items) VALUES ($1, $2, $3) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.email.as_str())
        .bind(Json(&items))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        let order = Order::try_from(row)?;
        tracing::info!(order_id = %order.id, items = order.items.len(), "Order placed");
        Ok(Some(order))
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        row.map(Order::try_from).transpose()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
