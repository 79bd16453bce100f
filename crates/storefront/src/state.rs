//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::{CheckoutService, MayaClient, PaymentError, PricingService};
use crate::store::PricingStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn PricingStore>,
    pricing: PricingService,
    checkout: CheckoutService,
}

impl AppState {
    /// Create a new application state over a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the Maya client cannot be built from its config.
    pub fn new(config: StorefrontConfig, store: Arc<dyn PricingStore>) -> Result<Self, PaymentError> {
        let maya = config
            .maya
            .as_ref()
            .map(|maya| MayaClient::new(maya, &config.base_url))
            .transpose()?;
        if maya.is_none() {
            tracing::warn!("Maya keys not set, only cash on delivery is available");
        }

        let pricing = PricingService::new(Arc::clone(&store), config.pricing);
        let checkout = CheckoutService::new(Arc::clone(&store), pricing.clone(), maya);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                pricing,
                checkout,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn PricingStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingService {
        &self.inner.pricing
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
