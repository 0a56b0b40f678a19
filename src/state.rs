//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::documents::DeliveryCache;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    cache: DeliveryCache,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool, cache: DeliveryCache) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, db, cache }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn cache(&self) -> &DeliveryCache {
        &self.inner.cache
    }

    /// Base URL used when building document and thumbnail references.
    pub fn base_url(&self) -> &str {
        &self.inner.config.server.public_base_url
    }
}
