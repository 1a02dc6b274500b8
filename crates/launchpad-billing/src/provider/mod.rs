//! Payment Provider
//!
//! The seam between the billing flows and Stripe. Handlers only see
//! [`PaymentProvider`], so tests can swap in [`MockPaymentProvider`].

mod mock;

pub use mock::MockPaymentProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::event::{StripeEvent, METADATA_EMAIL, METADATA_USER_ID};

/// Identifiers that let webhook events be traced back to a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationMetadata {
    pub user_id: String,
    pub email: String,
}

impl CorrelationMetadata {
    /// Render as Stripe metadata, using the keys the webhook reader expects
    pub fn to_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (METADATA_USER_ID.to_string(), self.user_id.clone()),
            (METADATA_EMAIL.to_string(), self.email.clone()),
        ])
    }
}

/// Request to create a subscription checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Stripe price to subscribe to
    pub price_id: String,

    pub customer_email: String,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,

    /// Attached to the session and to the subscription it creates
    pub metadata: CorrelationMetadata,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session ID
    pub id: String,

    /// URL to redirect user to
    pub url: String,
}

/// Payment provider client (Strategy pattern)
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout session in subscription mode
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Verify a webhook signature over the raw body and parse the event
    fn construct_event(&self, payload: &[u8], signature: &str) -> Result<StripeEvent>;

    /// Provider name
    fn name(&self) -> &str;
}
