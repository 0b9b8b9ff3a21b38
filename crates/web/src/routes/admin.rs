//! Admin product management.
//!
//! Every route requires a logged-in user, and every query is scoped to the
//! products that user created. Someone else's product is reported as missing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use emporium_core::{ProductId, UserId};
use tower_sessions::Session;

use super::cart::ProductIdForm;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{Flash, RequireUser, ViewContext, set_flash};
use crate::models::{FlashMessage, Page, PageQuery, PageRequest, Product, ProductForm};
use crate::services::UploadedImage;
use crate::state::AppState;

/// Shown when the add form arrives without a usable image.
const IMAGE_REQUIRED_MESSAGE: &str = "Attached file is not an image.";

// =============================================================================
// Templates
// =============================================================================

/// Add/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_product.html")]
pub struct EditProductTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    /// Set when editing an existing product.
    pub product_id: Option<ProductId>,
    pub form: ProductForm,
    pub error: Option<String>,
}

impl EditProductTemplate {
    fn add(view: ViewContext, form: ProductForm, error: Option<String>) -> Self {
        Self {
            view,
            flash: None,
            page_title: "Add Product",
            product_id: None,
            form,
            error,
        }
    }

    fn edit(view: ViewContext, id: ProductId, form: ProductForm, error: Option<String>) -> Self {
        Self {
            view,
            flash: None,
            page_title: "Edit Product",
            product_id: Some(id),
            form,
            error,
        }
    }

    /// Where the form posts to.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        if self.product_id.is_some() {
            "/admin/edit-product"
        } else {
            "/admin/add-product"
        }
    }
}

/// The owner's product list.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub path: &'static str,
    pub products: Page<Product>,
}

// =============================================================================
// Multipart Parsing
// =============================================================================

/// Everything a product form submits.
#[derive(Debug, Default)]
struct ProductSubmission {
    form: ProductForm,
    /// `None` when no file was sent or it was not a PNG/JPEG.
    image: Option<UploadedImage>,
    product_id: Option<String>,
}

impl ProductSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "title" => submission.form.title = text(field).await?,
                "price" => submission.form.price = text(field).await?,
                "description" => submission.form.description = text(field).await?,
                "productId" => submission.product_id = Some(text(field).await?),
                "image" => {
                    let file_name = field.file_name().map(str::to_owned);
                    let content_type = field.content_type().map(str::to_owned);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    submission.image = UploadedImage::accept(
                        file_name.as_deref(),
                        content_type.as_deref(),
                        bytes,
                    );
                    if submission.image.is_none() {
                        tracing::debug!(content_type = ?content_type, "Dropped non-image upload");
                    }
                }
                _ => {}
            }
        }

        Ok(submission)
    }
}

async fn text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(multipart_error)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

// =============================================================================
// Routes
// =============================================================================

/// `GET /admin/add-product`
pub async fn add_product_page(
    RequireUser(_user): RequireUser,
    view: ViewContext,
    Flash(flash): Flash,
) -> impl IntoResponse {
    EditProductTemplate {
        flash,
        ..EditProductTemplate::add(view, ProductForm::default(), None)
    }
}

/// `POST /admin/add-product`
///
/// The image is required; a missing or filtered file re-renders the form.
pub async fn add_product(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    view: ViewContext,
    multipart: Multipart,
) -> Result<Response> {
    let ProductSubmission { form, image, .. } = ProductSubmission::read(multipart).await?;

    let Some(image) = image else {
        return Ok(form_error(EditProductTemplate::add(
            view,
            form,
            Some(IMAGE_REQUIRED_MESSAGE.to_string()),
        )));
    };
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            return Ok(form_error(EditProductTemplate::add(view, form, Some(e.to_string()))));
        }
    };

    let image_name = state.images().save(&image).await?;
    let product = match state
        .db()
        .create_product(user.id, valid.with_image(image_name.clone()))
        .await
    {
        Ok(product) => product,
        Err(e) => {
            discard_image(&state, &image_name).await;
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %product.id, owner_id = %user.id, "Product created");
    add_breadcrumb("admin", "Created product", Some(&[("title", product.title.as_str())]));
    set_flash(&session, FlashMessage::success("Product added.")).await?;
    Ok(Redirect::to("/admin/products").into_response())
}

/// `GET /admin/products`
pub async fn products(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let request = PageRequest::new(query.page(), state.config().products_per_page);
    let products = state.db().list_products(Some(user.id), request).await?;

    Ok(AdminProductsTemplate {
        view,
        flash,
        page_title: "Admin Products",
        path: "/admin/products",
        products,
    })
}

/// `GET /admin/edit-product/{id}`
pub async fn edit_product_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<impl IntoResponse> {
    let product = owned_product(&state, user.id, &id).await?;

    Ok(EditProductTemplate {
        flash,
        ..EditProductTemplate::edit(view, product.id, ProductForm::from_product(&product), None)
    })
}

/// `POST /admin/edit-product`
///
/// A new image replaces the stored one, whose file is then removed. Without
/// one the current image is kept.
pub async fn edit_product(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    view: ViewContext,
    multipart: Multipart,
) -> Result<Response> {
    let ProductSubmission {
        form,
        image,
        product_id,
    } = ProductSubmission::read(multipart).await?;

    let existing = owned_product(&state, user.id, product_id.as_deref().unwrap_or_default()).await?;
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            return Ok(form_error(EditProductTemplate::edit(
                view,
                existing.id,
                form,
                Some(e.to_string()),
            )));
        }
    };

    let new_image = match &image {
        Some(image) => Some(state.images().save(image).await?),
        None => None,
    };

    let updated = match state
        .db()
        .update_product(user.id, existing.id, valid.into_changes(new_image.clone()))
        .await
    {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            if let Some(name) = &new_image {
                discard_image(&state, name).await;
            }
            return Err(AppError::NotFound(format!("product {}", existing.id)));
        }
        Err(e) => {
            if let Some(name) = &new_image {
                discard_image(&state, name).await;
            }
            return Err(e.into());
        }
    };

    if new_image.is_some() {
        state.images().remove(&existing.image).await?;
    }

    tracing::info!(product_id = %updated.id, owner_id = %user.id, "Product updated");
    set_flash(&session, FlashMessage::success("Product updated.")).await?;
    Ok(Redirect::to("/admin/products").into_response())
}

/// `POST /admin/delete-product`
///
/// Removes the product, its image, and every cart line holding it. Placed
/// orders keep their own copy.
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<ProductIdForm>,
) -> Result<Redirect> {
    let id = form.product_id()?;

    let removed = state
        .db()
        .delete_product(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    state.images().remove(&removed.image).await?;

    tracing::info!(product_id = %removed.id, owner_id = %user.id, "Product deleted");
    set_flash(&session, FlashMessage::success("Product deleted.")).await?;
    Ok(Redirect::to("/admin/products"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Load a product `owner` created. Unknown, malformed or foreign ids are 404.
async fn owned_product(state: &AppState, owner: UserId, raw_id: &str) -> Result<Product> {
    let not_found = || AppError::NotFound(format!("product {raw_id}"));

    let id: ProductId = raw_id.trim().parse().map_err(|_| not_found())?;
    state
        .db()
        .find_product(id)
        .await?
        .filter(|product| product.is_owned_by(owner))
        .ok_or_else(not_found)
}

/// Remove an image stored for a write that then failed.
async fn discard_image(state: &AppState, name: &str) {
    if let Err(e) = state.images().remove(name).await {
        tracing::warn!(error = %e, file = %name, "Failed to remove orphaned image");
    }
}

/// A re-rendered form with status 422.
fn form_error(template: EditProductTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}
