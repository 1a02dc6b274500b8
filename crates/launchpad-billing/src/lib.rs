//! # launchpad-billing
//!
//! Subscription checkout and Stripe webhook reconciliation for the launchpad
//! landing page.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  checkout   ┌─────────────────┐  redirect   ┌─────────────┐
//! │   Browser   │────────────▶│  Stripe Hosted  │────────────▶│  Landing    │
//! │  (signed in)│             │  Checkout Page  │             │  ?upgraded  │
//! └─────────────┘             └────────┬────────┘             └─────────────┘
//!                                      │ webhook events
//!                                      ▼
//!                             ┌─────────────────┐   ┌──────────────────┐
//!                             │ WebhookHandler  │──▶│  AccountStore    │
//!                             └─────────────────┘   └──────────────────┘
//! ```
//!
//! The checkout session and the subscription it spawns both carry `userId`
//! and `email` metadata. That metadata is the only link from a Stripe event
//! back to a [`User`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use launchpad_billing::{CheckoutService, CheckoutSettings, MemoryAccountStore, StripeClient};
//!
//! let store = Arc::new(MemoryAccountStore::new());
//! let stripe = Arc::new(StripeClient::new("sk_test_xxx", "whsec_xxx"));
//! let checkout = CheckoutService::new(
//!     store,
//!     stripe,
//!     CheckoutSettings::new("price_xxx", "https://yoursite.com"),
//! );
//!
//! let session = checkout.start("user@example.com").await?;
//! // Redirect user to: session.url
//! ```

mod account;
mod checkout;
mod error;
mod event;
#[cfg(feature = "postgres")]
mod postgres;
mod provider;
mod signature;
mod stripe_client;
mod webhook;

pub use account::{
    AccountStore, MemoryAccountStore, NewSubscription, Plan, Subscription, User, UserId,
    UserUpdate, FREE_USAGE_LIMIT, UNLIMITED_USAGE_LIMIT,
};
pub use checkout::{CheckoutService, CheckoutSettings};
pub use error::{BillingError, Result};
pub use event::{StripeEvent, SubscriptionStatus, WebhookEvent};
#[cfg(feature = "postgres")]
pub use postgres::PgAccountStore;
pub use provider::{
    CheckoutRequest, CheckoutSession, CorrelationMetadata, MockPaymentProvider, PaymentProvider,
};
pub use signature::{signature_header, WebhookVerifier, DEFAULT_TOLERANCE_SECS};
pub use stripe_client::StripeClient;
pub use webhook::WebhookHandler;
