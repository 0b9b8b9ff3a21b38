//! Cart and checkout route handlers.
//!
//! Every handler here requires a logged-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use emporium_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::RepositoryError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{Flash, RequireUser, ViewContext, set_flash};
use crate::models::{Cart, FlashMessage};
use crate::state::AppState;

/// Form posted by "Add to Cart" and "Delete" buttons.
#[derive(Debug, Deserialize)]
pub struct ProductIdForm {
    #[serde(rename = "productId", default)]
    pub product_id: String,
}

impl ProductIdForm {
    /// The referenced product. A malformed id is a missing product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the id does not parse.
    pub fn product_id(&self) -> Result<ProductId> {
        self.product_id
            .trim()
            .parse()
            .map_err(|_| AppError::NotFound(format!("product {}", self.product_id)))
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/cart.html")]
pub struct CartTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub cart: Cart,
}

/// Checkout summary template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/checkout.html")]
pub struct CheckoutTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub cart: Cart,
}

/// `GET /cart`
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let cart = state.db().cart(user.id).await?;

    Ok(CartTemplate {
        view,
        flash,
        page_title: "Your Cart",
        cart,
    })
}

/// `POST /cart`: add one unit of `productId`.
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ProductIdForm>,
) -> Result<Redirect> {
    let product_id = form.product_id()?;

    state
        .db()
        .add_to_cart(user.id, product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("product {product_id}")),
            other => AppError::Database(other),
        })?;

    add_breadcrumb(
        "cart",
        "Added product to cart",
        Some(&[("product_id", product_id.to_string().as_str())]),
    );
    Ok(Redirect::to("/cart"))
}

/// `POST /cart-delete-item`: drop the whole line for `productId`.
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ProductIdForm>,
) -> Result<Redirect> {
    let product_id = form.product_id()?;
    state.db().remove_from_cart(user.id, product_id).await?;

    Ok(Redirect::to("/cart"))
}

/// `GET /checkout`
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let cart = state.db().cart(user.id).await?;

    Ok(CheckoutTemplate {
        view,
        flash,
        page_title: "Checkout",
        cart,
    })
}

/// `POST /create-order`: turn the cart into an order.
///
/// An empty cart places nothing and sends the user back to the cart page.
pub async fn create_order(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Redirect> {
    match state.db().place_order(&user).await? {
        Some(order) => {
            add_breadcrumb(
                "order",
                "Placed order",
                Some(&[("order_id", order.id.to_string().as_str())]),
            );
            set_flash(&session, FlashMessage::success("Thank you! Your order has been placed."))
                .await?;
            Ok(Redirect::to("/orders"))
        }
        None => {
            set_flash(&session, FlashMessage::error("Your cart is empty.")).await?;
            Ok(Redirect::to("/cart"))
        }
    }
}
