//! Stripe Checkout Integration
//!
//! Hosted checkout for the single subscription price. The correlation
//! metadata goes on the session *and* on `subscription_data`: Stripe does not
//! copy session metadata onto the subscription, and the
//! `customer.subscription.*` events only carry the subscription's own.

use async_trait::async_trait;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionSubscriptionData,
};

use crate::error::{BillingError, Result};
use crate::event::StripeEvent;
use crate::provider::{CheckoutRequest, CheckoutSession, PaymentProvider};
use crate::signature::WebhookVerifier;

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    verifier: WebhookVerifier,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            verifier: WebhookVerifier::new(webhook_secret),
        }
    }

    /// Override how old a signed webhook may be, in seconds
    pub fn with_webhook_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.verifier = self.verifier.with_tolerance(tolerance_secs);
        self
    }
}

fn checkout_params(request: &CheckoutRequest) -> CreateCheckoutSession<'_> {
    let metadata = request.metadata.to_metadata();

    let mut params = CreateCheckoutSession::new();
    params.customer_email = Some(&request.customer_email);
    params.success_url = Some(&request.success_url);
    params.cancel_url = Some(&request.cancel_url);
    params.mode = Some(CheckoutSessionMode::Subscription);
    params.line_items = Some(vec![CreateCheckoutSessionLineItems {
        price: Some(request.price_id.clone()),
        quantity: Some(1),
        ..Default::default()
    }]);
    params.metadata = Some(metadata.clone());
    params.subscription_data = Some(CreateCheckoutSessionSubscriptionData {
        metadata: Some(metadata),
        ..Default::default()
    });
    params
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let session = StripeCheckoutSession::create(&self.client, checkout_params(request))
            .await
            .map_err(|e| BillingError::Stripe(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| BillingError::Stripe("No checkout URL returned".into()))?;

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url,
        })
    }

    fn construct_event(&self, payload: &[u8], signature: &str) -> Result<StripeEvent> {
        self.verifier.construct_event(payload, signature)
    }

    fn name(&self) -> &str {
        "Stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CorrelationMetadata;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            price_id: "price_123".into(),
            customer_email: "a@example.com".into(),
            success_url: "https://app.test/?upgraded=true&session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "https://app.test/?payment_canceled=true".into(),
            metadata: CorrelationMetadata {
                user_id: "u1".into(),
                email: "a@example.com".into(),
            },
        }
    }

    #[test]
    fn test_subscription_mode_single_price() {
        let request = request();
        let params = checkout_params(&request);

        assert_eq!(params.mode, Some(CheckoutSessionMode::Subscription));
        assert_eq!(params.customer_email, Some("a@example.com"));

        let items = params.line_items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price.as_deref(), Some("price_123"));
        assert_eq!(items[0].quantity, Some(1));
    }

    #[test]
    fn test_metadata_on_session_and_subscription() {
        let request = request();
        let params = checkout_params(&request);

        let session_metadata = params.metadata.clone().unwrap();
        assert_eq!(session_metadata.get("userId").map(String::as_str), Some("u1"));
        assert_eq!(
            session_metadata.get("email").map(String::as_str),
            Some("a@example.com")
        );

        let subscription_metadata = params.subscription_data.and_then(|s| s.metadata);
        assert_eq!(subscription_metadata, Some(session_metadata));
    }
}
