//! Integration tests for error pages, health checks and response headers.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use emporium_integration_tests::TestApp;

#[tokio::test]
async fn test_unknown_path_renders_404_page() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let response = app.server.get("/no/such/page").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body = response.text();
    assert!(body.contains("Page Not Found!"));
    assert!(body.contains("<title>Page Not Found</title>"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_path_renders_404_page_for_any_method() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let response = app.server.post("/no-such-page").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("Page Not Found!"));

    let response = app.server.delete("/images/missing.png").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("Page Not Found!"));
    Ok(())
}

#[tokio::test]
async fn test_404_page_keeps_navigation_state() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.logged_in_user("user@example.com").await?;

    let response = app.server.get("/missing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(response.text().contains("Logout"));
    Ok(())
}

#[tokio::test]
async fn test_500_route_renders_error_page() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let response = app.server.get("/500").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().contains("Some error occurred!"));
    Ok(())
}

#[tokio::test]
async fn test_failing_database_renders_500_page() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.db.set_unavailable(true);

    let response = app.server.get("/products").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text();
    assert!(body.contains("Some error occurred!"));
    assert!(!body.contains("unavailable"));
    Ok(())
}

#[tokio::test]
async fn test_failing_user_lookup_renders_500_page() -> anyhow::Result<()> {
    let app = TestApp::new()?;
    app.logged_in_user("user@example.com").await?;
    app.db.set_unavailable(true);

    let response = app.server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text();
    assert!(body.contains("Some error occurred!"));
    // Rendered before the user was resolved, so the session alone decides
    assert!(body.contains("Logout"));

    app.db.set_unavailable(false);
    assert_eq!(app.server.get("/").await.status_code(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_health_endpoints() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");

    assert_eq!(app.server.get("/health/ready").await.status_code(), StatusCode::OK);
    app.db.set_unavailable(true);
    assert_eq!(
        app.server.get("/health/ready").await.status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    Ok(())
}

#[tokio::test]
async fn test_security_headers() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let response = app.server.get("/").await;
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert!(
        response
            .header("content-security-policy")
            .to_str()?
            .contains("frame-ancestors 'none'")
    );
    assert_eq!(response.header("cache-control"), "no-store, max-age=0");
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() -> anyhow::Result<()> {
    let app = TestApp::new()?;

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-abc-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-abc-123");
    Ok(())
}
