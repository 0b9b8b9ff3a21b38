//! Authentication route handlers.
//!
//! Handles login, signup, logout and password reset against the local user
//! table. Reset links are written to the log; there is no mail transport.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use emporium_core::UserId;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{Flash, ViewContext, end_user_session, set_flash, start_user_session};
use crate::models::FlashMessage;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Shown after every reset request, whether or not the address is known.
const RESET_REQUESTED_MESSAGE: &str =
    "If that address belongs to an account, a reset link is on its way.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "confirmPassword", default)]
    pub confirm_password: String,
}

/// Password reset request form data.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub email: String,
}

/// New password form data, posted from the reset link page.
#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(rename = "confirmPassword", default)]
    pub confirm_password: String,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "passwordToken", default)]
    pub password_token: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub error: Option<String>,
    pub email: String,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub error: Option<String>,
    pub email: String,
}

/// Password reset request template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
}

/// New password template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    pub view: ViewContext,
    pub flash: Option<FlashMessage>,
    pub page_title: &'static str,
    pub error: Option<String>,
    pub user_id: String,
    pub password_token: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// `GET /login`
pub async fn login_page(view: ViewContext, Flash(flash): Flash) -> impl IntoResponse {
    LoginTemplate {
        view,
        flash,
        page_title: "Login",
        error: None,
        email: String::new(),
    }
}

/// `POST /login`
///
/// On success the session id is cycled and the user stored in the session.
/// Bad credentials re-render the form with status 422.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    view: ViewContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.db())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            start_user_session(&session, &user).await?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            add_breadcrumb("auth", "User logged in", None);
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_user_error() => {
            tracing::warn!(error = %e, "Login failed");
            Ok(form_error(LoginTemplate {
                view,
                flash: None,
                page_title: "Login",
                error: Some(e.to_string()),
                email: form.email,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Signup Routes
// =============================================================================

/// `GET /signup`
pub async fn signup_page(view: ViewContext, Flash(flash): Flash) -> impl IntoResponse {
    SignupTemplate {
        view,
        flash,
        page_title: "Signup",
        error: None,
        email: String::new(),
    }
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    view: ViewContext,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    match AuthService::new(state.db())
        .signup(&form.email, &form.password, &form.confirm_password)
        .await
    {
        Ok(_) => {
            set_flash(
                &session,
                FlashMessage::success("Your account has been created. Please log in."),
            )
            .await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) if e.is_user_error() => Ok(form_error(SignupTemplate {
            view,
            flash: None,
            page_title: "Signup",
            error: Some(e.to_string()),
            email: form.email,
        })),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// `POST /logout`: destroy the session.
pub async fn logout(session: Session) -> Result<Redirect> {
    end_user_session(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// `GET /reset`
pub async fn reset_page(view: ViewContext, Flash(flash): Flash) -> impl IntoResponse {
    ResetTemplate {
        view,
        flash,
        page_title: "Reset Password",
    }
}

/// `POST /reset`: issue a one-hour reset token.
///
/// The reply is the same whether or not the address has an account.
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResetForm>,
) -> Result<Redirect> {
    let issued = AuthService::new(state.db())
        .request_password_reset(&form.email, Utc::now())
        .await?;

    if let Some((user, token)) = issued {
        tracing::info!(
            user_id = %user.id,
            reset_url = %format!("{}/reset/{token}", state.config().base_url),
            "Password reset requested"
        );
    }

    set_flash(&session, FlashMessage::success(RESET_REQUESTED_MESSAGE)).await?;
    Ok(Redirect::to("/"))
}

/// `GET /reset/{token}`
pub async fn new_password_page(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    view: ViewContext,
    Flash(flash): Flash,
) -> Result<Response> {
    match AuthService::new(state.db())
        .user_for_reset_token(&token, Utc::now())
        .await
    {
        Ok(user) => Ok(NewPasswordTemplate {
            view,
            flash,
            page_title: "New Password",
            error: None,
            user_id: user.id.to_string(),
            password_token: token,
        }
        .into_response()),
        Err(AuthError::InvalidResetToken) => invalid_reset_link(&session).await,
        Err(e) => Err(e.into()),
    }
}

/// `POST /new-password`: set the password and consume the token.
pub async fn new_password(
    State(state): State<AppState>,
    session: Session,
    view: ViewContext,
    Form(form): Form<NewPasswordForm>,
) -> Result<Response> {
    let Ok(user_id) = form.user_id.trim().parse::<UserId>() else {
        return invalid_reset_link(&session).await;
    };

    match AuthService::new(state.db())
        .reset_password(
            user_id,
            &form.password_token,
            &form.password,
            &form.confirm_password,
            Utc::now(),
        )
        .await
    {
        Ok(()) => {
            set_flash(
                &session,
                FlashMessage::success("Your password has been updated. Please log in."),
            )
            .await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(AuthError::InvalidResetToken) => invalid_reset_link(&session).await,
        Err(e) if e.is_user_error() => Ok(form_error(NewPasswordTemplate {
            view,
            flash: None,
            page_title: "New Password",
            error: Some(e.to_string()),
            user_id: form.user_id,
            password_token: form.password_token,
        })),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// A re-rendered form with status 422.
fn form_error(template: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

async fn invalid_reset_link(session: &Session) -> Result<Response> {
    set_flash(session, FlashMessage::error(AuthError::InvalidResetToken.to_string()))
        .await
        .map_err(AppError::from)?;
    Ok(Redirect::to("/reset").into_response())
}
