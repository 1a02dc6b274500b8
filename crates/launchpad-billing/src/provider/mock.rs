//! Mock Payment Provider
//!
//! Records checkout requests instead of calling Stripe. Webhook payloads are
//! still verified with the real signature scheme.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::{CheckoutRequest, CheckoutSession, PaymentProvider};
use crate::error::{BillingError, Result};
use crate::event::StripeEvent;
use crate::signature::WebhookVerifier;

/// Mock provider that records every checkout request
pub struct MockPaymentProvider {
    verifier: WebhookVerifier,
    requests: Mutex<Vec<CheckoutRequest>>,
    fail_checkout: AtomicBool,
}

impl MockPaymentProvider {
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            verifier: WebhookVerifier::new(webhook_secret),
            requests: Mutex::new(Vec::new()),
            fail_checkout: AtomicBool::new(false),
        }
    }

    /// Make subsequent checkout calls fail like an unreachable API
    pub fn fail_checkouts(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    /// Checkout requests received so far, oldest first
    pub async fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());

        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(BillingError::Stripe("mock checkout failure".into()));
        }

        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }

    fn construct_event(&self, payload: &[u8], signature: &str) -> Result<StripeEvent> {
        self.verifier.construct_event(payload, signature)
    }

    fn name(&self) -> &str {
        "MockStripe"
    }
}
