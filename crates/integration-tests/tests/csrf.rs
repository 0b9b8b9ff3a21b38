//! Integration tests for the optional CSRF protection.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use emporium_integration_tests::{PASSWORD, TestApp, location};

/// Pull the hidden `_csrf` field out of a rendered page.
fn csrf_token(html: &str) -> Option<String> {
    let marker = "name=\"_csrf\" value=\"";
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}

#[tokio::test]
async fn test_post_without_token_is_forbidden() -> anyhow::Result<()> {
    let app = TestApp::with_csrf()?;
    app.create_user("user@example.com").await?;

    let response = app.login("user@example.com", PASSWORD).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_form_field_token_is_accepted() -> anyhow::Result<()> {
    let app = TestApp::with_csrf()?;
    app.create_user("user@example.com").await?;

    let page = app.server.get("/login").await.text();
    let token = csrf_token(&page).ok_or_else(|| anyhow::anyhow!("no token in login form"))?;

    let response = app
        .server
        .post("/login")
        .form(&[
            ("email", "user@example.com"),
            ("password", PASSWORD),
            ("_csrf", token.as_str()),
        ])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    // A wrong token is refused even with a live session
    let response = app
        .server
        .post("/logout")
        .form(&[("_csrf", "forged")])
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_header_token_is_accepted() -> anyhow::Result<()> {
    let app = TestApp::with_csrf()?;

    let page = app.server.get("/reset").await.text();
    let token = csrf_token(&page).ok_or_else(|| anyhow::anyhow!("no token in reset form"))?;

    let response = app
        .server
        .post("/reset")
        .add_header(
            HeaderName::from_static("x-csrf-token"),
            HeaderValue::from_str(&token)?,
        )
        .form(&[("email", "nobody@example.com")])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn test_multipart_form_uses_query_token() -> anyhow::Result<()> {
    let app = TestApp::with_csrf()?;
    app.create_user("admin@example.com").await?;

    let page = app.server.get("/login").await.text();
    let token = csrf_token(&page).ok_or_else(|| anyhow::anyhow!("no token in login form"))?;
    app.server
        .post("/login")
        .form(&[
            ("email", "admin@example.com"),
            ("password", PASSWORD),
            ("_csrf", token.as_str()),
        ])
        .await;

    let add_page = app.server.get("/admin/add-product").await.text();
    assert!(add_page.contains(&format!("/admin/add-product?_csrf={token}")));

    let form = || {
        MultipartForm::new()
            .add_text("title", "Glass Vase")
            .add_text("price", "15")
            .add_text("description", "Handblown glass vase.")
            .add_part(
                "image",
                Part::bytes(b"\x89PNG\r\n\x1a\n".to_vec())
                    .file_name("vase.png")
                    .mime_type("image/png"),
            )
    };

    let response = app.server.post("/admin/add-product").multipart(form()).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert!(app.stored_images()?.is_empty());

    let response = app
        .server
        .post("/admin/add-product")
        .add_query_param("_csrf", &token)
        .multipart(form())
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(app.stored_images()?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_disabled_by_default() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let page = app.server.get("/login").await.text();
    assert!(csrf_token(&page).is_none());

    let response = app
        .server
        .post("/reset")
        .form(&[("email", "nobody@example.com")])
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    Ok(())
}
