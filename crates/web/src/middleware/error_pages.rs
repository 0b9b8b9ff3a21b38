//! Renders the 404 and 500 pages for responses tagged with [`ErrorPage`].

use askama::Template;
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;

use super::view_context::ViewContext;
use crate::error::ErrorPage;
use crate::routes::errors::{NotFoundTemplate, ServerErrorTemplate};

/// Replace the plain-text body of error responses with the rendered page.
///
/// Sits outside user resolution so failures there get the page too. The
/// navigation state comes from the response's [`ViewContext`] when the
/// request got that far, otherwise from the session alone.
pub async fn error_page_middleware(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.extensions().get::<ErrorPage>().is_none() {
        return response;
    }

    let status = response.status();
    let view = match response.extensions().get::<ViewContext>() {
        Some(view) => view.clone(),
        None => ViewContext::for_error_page(&session).await,
    };

    let rendered = if status == StatusCode::NOT_FOUND {
        NotFoundTemplate::new(view).render()
    } else {
        ServerErrorTemplate::new(view).render()
    };

    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            response
        }
    }
}
