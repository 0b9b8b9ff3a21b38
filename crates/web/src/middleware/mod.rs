//! HTTP middleware stack for the shop.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request logging)
//! 3. Compression
//! 4. Security headers
//! 5. Request ID
//! 6. Session layer (tower-sessions)
//! 7. Error pages (render 404/500 bodies)
//! 8. Current user (resolve session user, hard logout if gone)
//! 9. View context (login flag, CSRF token for templates)
//! 10. CSRF check (only when enabled)

pub mod auth;
pub mod csrf;
pub mod error_pages;
pub mod flash;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod view_context;

pub use auth::{
    CurrentUser, OptionalUser, RequireUser, end_user_session, load_current_user,
    start_user_session,
};
pub use csrf::csrf_middleware;
pub use error_pages::error_page_middleware;
pub use flash::{Flash, set_flash};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, postgres_store};
pub use view_context::{ViewContext, view_context_middleware};
