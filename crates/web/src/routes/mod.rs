//! HTTP route handlers for the shop.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database ping)
//!
//! # Shop
//! GET  /                            - Product listing (index)
//! GET  /products                    - Product listing
//! GET  /products/{id}               - Product detail
//! GET  /cart                        - Cart page
//! POST /cart                        - Add one unit of a product
//! POST /cart-delete-item            - Remove a cart line
//! GET  /checkout                    - Checkout summary
//! POST /create-order                - Place an order from the cart
//! GET  /orders                      - Order history
//! GET  /orders/{id}                 - Plain-text invoice
//!
//! # Auth
//! GET  /login                       - Login page
//! POST /login                       - Login action
//! GET  /signup                      - Signup page
//! POST /signup                      - Signup action
//! POST /logout                      - Logout action
//! GET  /reset                       - Reset request page
//! POST /reset                       - Issue a reset token
//! GET  /reset/{token}               - New password page
//! POST /new-password                - Set a new password
//!
//! # Admin (requires auth, scoped to the owner)
//! GET  /admin/add-product           - Add product form
//! POST /admin/add-product           - Create product (multipart)
//! GET  /admin/products              - Owner's products
//! GET  /admin/edit-product/{id}     - Edit product form
//! POST /admin/edit-product          - Update product (multipart)
//! POST /admin/delete-product        - Delete product
//!
//! # Errors
//! GET  /500                         - Server error page
//! *                                 - Not found page (fallback)
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod errors;
pub mod orders;
pub mod shop;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/products", get(shop::products))
        .route("/products/{id}", get(shop::product_detail))
        .route("/cart", get(cart::show).post(cart::add))
        .route("/cart-delete-item", post(cart::remove))
        .route("/checkout", get(cart::checkout))
        .route("/create-order", post(cart::create_order))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::invoice))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/logout", post(auth::logout))
        .route("/reset", get(auth::reset_page).post(auth::reset))
        .route("/reset/{token}", get(auth::new_password_page))
        .route("/new-password", post(auth::new_password))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/add-product",
            get(admin::add_product_page).post(admin::add_product),
        )
        .route("/products", get(admin::products))
        .route("/edit-product/{id}", get(admin::edit_product_page))
        .route("/edit-product", post(admin::edit_product))
        .route("/delete-product", post(admin::delete_product))
}

/// All page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(shop_routes())
        .merge(auth_routes())
        .nest("/admin", admin_routes())
        .route("/500", get(errors::server_error))
}
