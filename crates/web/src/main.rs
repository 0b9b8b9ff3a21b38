//! Emporium - server-rendered web shop.
//!
//! # Architecture
//!
//! - Axum web framework, Askama templates for server-side rendering
//! - `PostgreSQL` for users, products, carts, orders and sessions
//! - Product images stored on the local filesystem and served under `/images`
//!
//! TLS is terminated by the deployment proxy; this binary speaks plain HTTP.
//! Migrations are NOT run on startup. Run them via:
//! `cargo run -p emporium-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::fmt::Display;
use std::sync::Arc;

use emporium_web::config::ShopConfig;
use emporium_web::state::AppState;
use emporium_web::{db, middleware};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ShopConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Log a fatal startup error and exit non-zero.
fn fail(context: &str, error: impl Display) -> ! {
    tracing::error!(error = %error, "{context}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = match ShopConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Tracing is not set up yet
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium_web=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if config.sentry_dsn.is_some() {
        tracing::info!("Sentry initialized");
    }

    // The server never starts without a database
    let database = match db::connect(&config.database_url).await {
        Ok(database) => database,
        Err(e) => fail("Failed to connect to database", e),
    };
    tracing::info!("Database pool created");

    let session_store = match middleware::postgres_store(database.pool().clone()) {
        Ok(store) => store,
        Err(e) => fail("Failed to create session store", e),
    };

    let addr = config.socket_addr();
    if config.csrf_protection {
        tracing::info!("CSRF protection enabled");
    }

    let state = AppState::new(config, Arc::new(database));
    let app = emporium_web::app(state, session_store)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => fail("Failed to bind to address", e),
    };
    tracing::info!("emporium listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        fail("Server error", e);
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
