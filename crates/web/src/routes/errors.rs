//! Error pages.
//!
//! The templates here are rendered by `middleware::error_pages` for any
//! response tagged as a 404 or server error, so handlers only need to return
//! an [`AppError`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{http::StatusCode, response::IntoResponse};

use crate::error::AppError;
use crate::middleware::ViewContext;
use crate::models::FlashMessage;

/// "Page Not Found" template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
}

impl NotFoundTemplate {
    #[must_use]
    pub const fn new(view: ViewContext) -> Self {
        Self {
            view,
            flash: None,
            page_title: "Page Not Found",
        }
    }
}

/// "Error!" template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/500.html")]
pub struct ServerErrorTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
}

impl ServerErrorTemplate {
    #[must_use]
    pub const fn new(view: ViewContext) -> Self {
        Self {
            view,
            flash: None,
            page_title: "Error!",
        }
    }
}

/// Fallback for paths no route or static file matches.
pub async fn not_found() -> AppError {
    AppError::NotFound("no such page".to_string())
}

/// `GET /500`: the error page, rendered directly.
pub async fn server_error(view: ViewContext) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ServerErrorTemplate::new(view),
    )
}
