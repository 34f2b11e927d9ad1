use std::sync::Arc;

use content_rest_core::auth::TokenKeys;
use content_rest_core::events::SubscriberRegistry;
use content_rest_core::Store;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: Arc<dyn Store>,
    config: AppConfig,
    registry: Arc<SubscriberRegistry>,
    tokens: TokenKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig, registry: Arc<SubscriberRegistry>) -> Self {
        let tokens = TokenKeys::new(&config.jwt_secret, config.jwt_ttl_secs);
        Self {
            inner: Arc::new(InnerState {
                store,
                config,
                registry,
                tokens,
            }),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.inner.registry
    }

    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }
}
