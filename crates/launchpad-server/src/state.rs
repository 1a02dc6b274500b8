//! Application State

use std::sync::Arc;

use axum::extract::FromRef;

use launchpad_billing::{
    AccountStore, CheckoutService, CheckoutSettings, PaymentProvider, WebhookHandler,
};

use crate::auth::SessionKeys;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Account store (PostgreSQL or in-memory)
    pub store: Arc<dyn AccountStore>,

    /// Payment provider (Stripe in production, mock in tests)
    pub payments: Arc<dyn PaymentProvider>,

    pub checkout: Arc<CheckoutService<dyn AccountStore, dyn PaymentProvider>>,

    pub webhooks: Arc<WebhookHandler<dyn AccountStore>>,

    pub session_keys: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccountStore>,
        payments: Arc<dyn PaymentProvider>,
        checkout_settings: CheckoutSettings,
        session_keys: SessionKeys,
    ) -> Self {
        Self {
            checkout: Arc::new(CheckoutService::new(
                store.clone(),
                payments.clone(),
                checkout_settings,
            )),
            webhooks: Arc::new(WebhookHandler::new(store.clone())),
            store,
            payments,
            session_keys: Arc::new(session_keys),
        }
    }
}

impl FromRef<AppState> for Arc<SessionKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.session_keys.clone()
    }
}
