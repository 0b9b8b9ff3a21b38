//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ShopConfig;
use crate::db::Database;
use crate::services::ImageStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the database and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ShopConfig,
    db: Arc<dyn Database>,
    images: ImageStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Shop configuration
    /// * `db` - Database-access object (Postgres in production, in-memory in tests)
    #[must_use]
    pub fn new(config: ShopConfig, db: Arc<dyn Database>) -> Self {
        let images = ImageStore::new(config.images_dir.clone());

        Self {
            inner: Arc::new(AppStateInner { config, db, images }),
        }
    }

    /// Get a reference to the shop configuration.
    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.inner.config
    }

    /// Get the database-access object.
    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.inner.db.as_ref()
    }

    /// Get the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }
}
