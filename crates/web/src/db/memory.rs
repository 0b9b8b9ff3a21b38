//! In-memory [`Database`] implementation.
//!
//! Used by tests and local tooling. Behaves like [`super::PgDatabase`] for
//! every operation, including owner scoping and cascade on product delete.
//! [`MemoryDatabase::set_unavailable`] makes every call fail the way a lost
//! connection would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use emporium_core::{Email, OrderId, ProductId, UserId};

use super::{Database, RepositoryError};
use crate::models::{
    Cart, CartLine, NewProduct, NewUser, Order, OrderItem, Page, PageRequest, Product,
    ProductChanges, User,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    /// Per-user cart lines in insertion order.
    carts: BTreeMap<UserId, Vec<(ProductId, u32)>>,
    orders: BTreeMap<OrderId, Order>,
    next_user_id: i32,
    next_product_id: i32,
    next_order_id: i32,
}

impl Tables {
    fn cart_for(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let lines = self
            .carts
            .get(&user)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|(product_id, quantity)| {
                let product = self.products.get(product_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart references missing product {product_id}"
                    ))
                })?;
                Ok(CartLine {
                    product: product.clone(),
                    quantity: *quantity,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        Ok(Cart { lines })
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Database held entirely in process memory.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the database connection.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delete a user and their cart, as an operator removing an account
    /// outside the app would. Returns whether the user existed.
    pub async fn remove_user(&self, id: UserId) -> bool {
        let mut tables = self.tables.write().await;
        tables.carts.remove(&id);
        tables.users.remove(&id).is_some()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory database marked unavailable".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = UserId::new(next_id(&mut tables.next_user_id));
        let created = User {
            id,
            email: user.email,
            password_hash: user.password_hash,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| &u.email == email).cloned())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.reset_token = Some(token.to_owned());
        user.reset_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn find_user_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.reset_token_valid(token, now))
            .cloned())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut user.password_hash);
        user.reset_token = None;
        user.reset_token_expires_at = None;
        Ok(())
    }

    async fn create_product(
        &self,
        owner: UserId,
        product: NewProduct,
    ) -> Result<Product, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner) {
            return Err(RepositoryError::NotFound);
        }

        let id = ProductId::new(next_id(&mut tables.next_product_id));
        let created = Product {
            id,
            owner_id: owner,
            title: product.title,
            price: product.price,
            description: product.description,
            image: product.image,
        };
        tables.products.insert(id, created.clone());
        Ok(created)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.check_available()?;
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(
        &self,
        owner: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<Product>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let matching: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| owner.is_none_or(|o| p.owner_id == o))
            .collect();

        let total = matching.len() as u64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn update_product(
        &self,
        owner: UserId,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let Some(product) = tables
            .products
            .get_mut(&id)
            .filter(|p| p.is_owned_by(owner))
        else {
            return Ok(None);
        };

        product.title = changes.title;
        product.price = changes.price;
        product.description = changes.description;
        if let Some(image) = changes.image {
            product.image = image;
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(
        &self,
        owner: UserId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.products.get(&id).is_some_and(|p| p.is_owned_by(owner)) {
            return Ok(None);
        }

        let removed = tables.products.remove(&id);
        for lines in tables.carts.values_mut() {
            lines.retain(|(product_id, _)| *product_id != id);
        }
        Ok(removed)
    }

    async fn cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        self.check_available()?;
        self.tables.read().await.cart_for(user)
    }

    async fn add_to_cart(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product) {
            return Err(RepositoryError::NotFound);
        }

        let lines = tables.carts.entry(user).or_default();
        match lines.iter_mut().find(|(id, _)| *id == product) {
            Some((_, quantity)) => *quantity += 1,
            None => lines.push((product, 1)),
        }
        Ok(())
    }

    async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        if let Some(lines) = tables.carts.get_mut(&user) {
            lines.retain(|(id, _)| *id != product);
        }
        Ok(())
    }

    async fn place_order(&self, user: &User) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        // One write guard for the whole checkout keeps it atomic
        let mut tables = self.tables.write().await;
        let cart = tables.cart_for(user.id)?;
        if cart.is_empty() {
            return Ok(None);
        }

        let id = OrderId::new(next_id(&mut tables.next_order_id));
        let order = Order {
            id,
            user_id: user.id,
            user_email: user.email.clone(),
            items: cart.lines.iter().map(OrderItem::from).collect(),
            created_at: Utc::now(),
        };
        tables.orders.insert(id, order.clone());
        tables.carts.remove(&user.id);
        Ok(Some(order))
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        // Ids grow with creation time, so reverse id order is newest first
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect())
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use emporium_core::Price;

    use super::*;

    async fn user(db: &MemoryDatabase, email: &str) -> User {
        db.create_user(NewUser {
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
    }

    async fn product(db: &MemoryDatabase, owner: UserId, title: &str, price: &str) -> Product {
        db.create_product(
            owner,
            NewProduct {
                title: title.to_string(),
                price: Price::parse(price).unwrap(),
                description: "A fine product".to_string(),
                image: format!("{title}.png"),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let db = MemoryDatabase::new();
        user(&db, "a@example.com").await;
        let err = db
            .create_user(NewUser {
                email: Email::parse("A@Example.com").unwrap(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        let now = Utc::now();

        db.set_reset_token(u.id, "tok", now + Duration::hours(1))
            .await
            .unwrap();
        assert!(db.find_user_by_reset_token("tok", now).await.unwrap().is_some());
        assert!(
            db.find_user_by_reset_token("tok", now + Duration::hours(2))
                .await
                .unwrap()
                .is_none()
        );

        db.update_password(u.id, "new-hash").await.unwrap();
        assert!(db.find_user_by_reset_token("tok", now).await.unwrap().is_none());
        assert_eq!(db.find_user(u.id).await.unwrap().unwrap().password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_list_products_paginates_and_filters_by_owner() {
        let db = MemoryDatabase::new();
        let alice = user(&db, "alice@example.com").await;
        let bob = user(&db, "bob@example.com").await;
        for i in 0..5 {
            product(&db, alice.id, &format!("Alice {i}"), "1").await;
        }
        product(&db, bob.id, "Bob 0", "1").await;

        let all = db.list_products(None, PageRequest::new(2, 4)).await.unwrap();
        assert_eq!(all.total_items, 6);
        assert_eq!(all.items.len(), 2);
        assert!(!all.has_next());

        let bobs = db
            .list_products(Some(bob.id), PageRequest::new(1, 4))
            .await
            .unwrap();
        assert_eq!(bobs.total_items, 1);
        assert_eq!(bobs.items[0].title, "Bob 0");
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_scoped() {
        let db = MemoryDatabase::new();
        let alice = user(&db, "alice@example.com").await;
        let bob = user(&db, "bob@example.com").await;
        let p = product(&db, alice.id, "Lamp", "10").await;

        let changes = ProductChanges {
            title: "Stolen".to_string(),
            price: Price::parse("1").unwrap(),
            description: "Not yours".to_string(),
            image: None,
        };
        assert!(db.update_product(bob.id, p.id, changes.clone()).await.unwrap().is_none());
        assert!(db.delete_product(bob.id, p.id).await.unwrap().is_none());

        let updated = db.update_product(alice.id, p.id, changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "Stolen");
        assert_eq!(updated.image, "Lamp.png");
    }

    #[tokio::test]
    async fn test_cart_add_increments_and_remove_drops_line() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        let p = product(&db, u.id, "Mug", "4.50").await;

        db.add_to_cart(u.id, p.id).await.unwrap();
        db.add_to_cart(u.id, p.id).await.unwrap();
        let cart = db.cart(u.id).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.total().to_string(), "9.00");

        db.remove_from_cart(u.id, p.id).await.unwrap();
        assert!(db.cart(u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        let err = db.add_to_cart(u.id, ProductId::new(99)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_product_cascades_to_carts_not_orders() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        let keep = product(&db, u.id, "Keep", "1").await;
        let gone = product(&db, u.id, "Gone", "2").await;

        db.add_to_cart(u.id, gone.id).await.unwrap();
        let order = db.place_order(&u).await.unwrap().unwrap();

        db.add_to_cart(u.id, keep.id).await.unwrap();
        db.add_to_cart(u.id, gone.id).await.unwrap();
        let removed = db.delete_product(u.id, gone.id).await.unwrap().unwrap();
        assert_eq!(removed.id, gone.id);

        let cart = db.cart(u.id).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].product.id, keep.id);

        let stored = db.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].title, "Gone");
    }

    #[tokio::test]
    async fn test_place_order_snapshots_and_clears_cart() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        let p = product(&db, u.id, "Book", "12.00").await;
        db.add_to_cart(u.id, p.id).await.unwrap();
        db.add_to_cart(u.id, p.id).await.unwrap();

        let order = db.place_order(&u).await.unwrap().unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.total().to_string(), "24.00");
        assert_eq!(order.user_email, u.email);
        assert!(db.cart(u.id).await.unwrap().is_empty());
        assert_eq!(db.orders_for_user(u.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_on_empty_cart_creates_nothing() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        assert!(db.place_order(&u).await.unwrap().is_none());
        assert!(db.orders_for_user(u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let db = MemoryDatabase::new();
        let u = user(&db, "a@example.com").await;
        let p = product(&db, u.id, "Book", "1").await;
        db.add_to_cart(u.id, p.id).await.unwrap();
        let first = db.place_order(&u).await.unwrap().unwrap();
        db.add_to_cart(u.id, p.id).await.unwrap();
        let second = db.place_order(&u).await.unwrap().unwrap();

        let ids: Vec<_> = db
            .orders_for_user(u.id)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let db = MemoryDatabase::new();
        db.set_unavailable(true);
        assert!(matches!(db.ping().await, Err(RepositoryError::Unavailable(_))));
        assert!(db.find_user(UserId::new(1)).await.is_err());
        db.set_unavailable(false);
        assert!(db.ping().await.is_ok());
    }
}
