//! Order history and invoices.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use emporium_core::OrderId;

use crate::error::{AppError, Result};
use crate::middleware::{Flash, RequireUser, ViewContext};
use crate::models::{FlashMessage, Order};
use crate::state::AppState;

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/orders.html")]
pub struct OrdersTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub orders: Vec<Order>,
}

/// `GET /orders`: the user's orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let orders = state.db().orders_for_user(user.id).await?;

    Ok(OrdersTemplate {
        view,
        flash,
        page_title: "Your Orders",
        orders,
    })
}

/// `GET /orders/{id}`: plain-text invoice.
///
/// Orders belonging to someone else are reported as missing.
pub async fn invoice(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound(format!("order {id}"));

    let order_id: OrderId = id.parse().map_err(|_| not_found())?;
    let order = state
        .db()
        .find_order(order_id)
        .await?
        .filter(|order| order.is_owned_by(user.id))
        .ok_or_else(not_found)?;

    tracing::debug!(order_id = %order.id, "Serving invoice");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"invoice-{}.txt\"", order.id),
            ),
        ],
        order.invoice_text(),
    ))
}
