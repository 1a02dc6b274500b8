//! Checkout Flow
//!
//! Turns an authenticated email into a hosted Stripe checkout session.

use std::sync::Arc;

use crate::account::AccountStore;
use crate::error::{BillingError, Result};
use crate::provider::{CheckoutRequest, CheckoutSession, CorrelationMetadata, PaymentProvider};

/// Price and redirect configuration for checkout
#[derive(Clone, Debug)]
pub struct CheckoutSettings {
    /// The single subscription price offered
    pub price_id: String,

    /// Public base URL of the landing page
    pub base_url: String,
}

impl CheckoutSettings {
    pub fn new(price_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            price_id: price_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Stripe substitutes `{CHECKOUT_SESSION_ID}` on redirect
    pub fn success_url(&self) -> String {
        format!(
            "{}/?upgraded=true&session_id={{CHECKOUT_SESSION_ID}}",
            self.base_url
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/?payment_canceled=true", self.base_url)
    }
}

/// Starts checkout sessions for existing users
pub struct CheckoutService<S: AccountStore + ?Sized, P: PaymentProvider + ?Sized> {
    store: Arc<S>,
    provider: Arc<P>,
    settings: CheckoutSettings,
}

impl<S: AccountStore + ?Sized, P: PaymentProvider + ?Sized> CheckoutService<S, P> {
    pub fn new(store: Arc<S>, provider: Arc<P>, settings: CheckoutSettings) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Create a checkout session for the user registered under `email`.
    ///
    /// Accounts are never created here: an unknown email is `UserNotFound`
    /// and Stripe is not called.
    pub async fn start(&self, email: &str) -> Result<CheckoutSession> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| BillingError::UserNotFound(email.to_string()))?;

        let request = CheckoutRequest {
            price_id: self.settings.price_id.clone(),
            customer_email: user.email.clone(),
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
            metadata: CorrelationMetadata {
                user_id: user.id.to_string(),
                email: user.email.clone(),
            },
        };

        let session = self.provider.create_checkout_session(&request).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            provider = self.provider.name(),
            "Created checkout session"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::MemoryAccountStore;
    use crate::provider::MockPaymentProvider;

    fn service(
        store: Arc<MemoryAccountStore>,
        provider: Arc<MockPaymentProvider>,
    ) -> CheckoutService<MemoryAccountStore, MockPaymentProvider> {
        CheckoutService::new(
            store,
            provider,
            CheckoutSettings::new("price_123", "https://app.test/"),
        )
    }

    #[test]
    fn test_redirect_urls() {
        let settings = CheckoutSettings::new("price_123", "https://app.test/");
        assert_eq!(
            settings.success_url(),
            "https://app.test/?upgraded=true&session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(settings.cancel_url(), "https://app.test/?payment_canceled=true");
    }

    #[tokio::test]
    async fn test_unknown_email_skips_provider() {
        let store = Arc::new(MemoryAccountStore::new());
        let provider = Arc::new(MockPaymentProvider::new("whsec_test"));
        let checkout = service(store, provider.clone());

        let result = checkout.start("ghost@example.com").await;
        assert!(matches!(result, Err(BillingError::UserNotFound(_))));
        assert!(provider.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_correlation() {
        let store = Arc::new(MemoryAccountStore::new());
        let user = store.create_user("a@example.com").await.unwrap();
        let provider = Arc::new(MockPaymentProvider::new("whsec_test"));
        let checkout = service(store, provider.clone());

        let session = checkout.start("a@example.com").await.unwrap();
        assert_eq!(session.id, "cs_test_1");

        let requests = provider.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].price_id, "price_123");
        assert_eq!(requests[0].customer_email, "a@example.com");
        assert_eq!(requests[0].metadata.user_id, user.id.to_string());
        assert_eq!(requests[0].metadata.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let store = Arc::new(MemoryAccountStore::new());
        store.create_user("a@example.com").await.unwrap();
        let provider = Arc::new(MockPaymentProvider::new("whsec_test"));
        provider.fail_checkouts(true);
        let checkout = service(store.clone(), provider);

        assert!(matches!(
            checkout.start("a@example.com").await,
            Err(BillingError::Stripe(_))
        ));
        let user = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert!(user.stripe_customer_id.is_none());
    }
}
