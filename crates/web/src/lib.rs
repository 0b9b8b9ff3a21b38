//! Emporium web shop library.
//!
//! This crate provides the shop as a library so the full router can be
//! driven in-process by the integration tests and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    handler::Handler,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Build the complete application router.
///
/// Layers run outermost first: body limit, trace, compression, security
/// headers, request id, session, error pages, current user, view context,
/// CSRF. Sentry layers are added on top by the binary.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let config = state.config();
    let session_layer = middleware::create_session_layer(session_store, config.secure_cookies());
    let not_found = routes::errors::not_found.with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service(
            "/images",
            ServeDir::new(&config.images_dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(not_found.clone()),
        )
        .fallback_service(
            ServeDir::new(&config.public_dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(not_found),
        )
        .layer(from_fn_with_state(state.clone(), middleware::csrf_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::view_context_middleware,
        ))
        .layer(from_fn_with_state(state.clone(), middleware::load_current_user))
        .layer(from_fn(middleware::error_page_middleware))
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Request span without the query string, which may carry the CSRF token.
fn request_span(request: &Request) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database does not answer.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.db().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use axum::body::Body;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_request_span_omits_query_string() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = axum::http::Request::post("/admin/add-product?_csrf=secret-token")
            .body(Body::empty())
            .unwrap();
        request_span(&request).in_scope(|| tracing::debug!("started processing request"));

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("path=/admin/add-product"));
        assert!(!output.contains("secret-token"));
    }
}
