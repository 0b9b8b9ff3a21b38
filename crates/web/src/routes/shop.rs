//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use emporium_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::{Flash, ViewContext};
use crate::models::{FlashMessage, Page, PageQuery, PageRequest, Product};
use crate::state::AppState;

/// Product listing template, used by both `/` and `/products`.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_list.html")]
pub struct ProductListTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    /// Path the pager links point at.
    pub path: &'static str,
    pub products: Page<Product>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product_detail.html")]
pub struct ProductDetailTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: String,
    pub product: Product,
}

/// `GET /`
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let products = product_page(&state, &query).await?;

    Ok(ProductListTemplate {
        view,
        flash,
        page_title: "Shop",
        path: "/",
        products,
    })
}

/// `GET /products`
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let products = product_page(&state, &query).await?;

    Ok(ProductListTemplate {
        view,
        flash,
        page_title: "All Products",
        path: "/products",
        products,
    })
}

/// `GET /products/{id}`. A malformed id is a missing product.
pub async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let id: ProductId = id
        .parse()
        .map_err(|_| AppError::NotFound(format!("product {id}")))?;

    let product = state
        .db()
        .find_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductDetailTemplate {
        view,
        flash,
        page_title: product.title.clone(),
        product,
    })
}

async fn product_page(state: &AppState, query: &PageQuery) -> Result<Page<Product>> {
    let request = PageRequest::new(query.page(), state.config().products_per_page);
    Ok(state.db().list_products(None, request).await?)
}
