//! Stripe Webhook Handling
//!
//! Reconciles subscription lifecycle events with the account store.
//!
//! | Event                             | Effect                                   |
//! |-----------------------------------|------------------------------------------|
//! | `checkout.session.completed`      | user → Paid, customer id recorded        |
//! | `customer.subscription.created`   | subscription row created                 |
//! | `customer.subscription.updated`   | `active` → Paid; `canceled`/`unpaid` → Free |
//! | `customer.subscription.deleted`   | user → Free, subscription rows removed   |
//!
//! Events without a `userId` in their metadata did not come from our checkout
//! flow and are ignored. Delivery order is not checked: the last event applied
//! wins.

use std::sync::Arc;

use crate::account::{AccountStore, NewSubscription, Plan, UserId, UserUpdate};
use crate::error::Result;
use crate::event::{StripeEvent, SubscriptionStatus, WebhookEvent};

/// Webhook handler
pub struct WebhookHandler<S: AccountStore + ?Sized> {
    store: Arc<S>,
}

impl<S: AccountStore + ?Sized> WebhookHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Process a verified webhook event
    pub async fn handle(&self, event: &StripeEvent) -> Result<WebhookEvent> {
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Processing Stripe webhook"
        );

        let parsed = WebhookEvent::try_from(event)?;

        let Some(user_id) = parsed.user_id().map(UserId::from_string) else {
            if let WebhookEvent::Other { event_type } = &parsed {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
            } else {
                tracing::debug!(
                    event_type = %event.event_type,
                    "No userId in metadata, ignoring"
                );
            }
            return Ok(parsed);
        };

        match &parsed {
            WebhookEvent::CheckoutCompleted {
                session_id,
                customer_id,
                ..
            } => {
                let update = UserUpdate::plan(Plan::Paid).with_customer(customer_id.clone());
                self.store.update_user(&user_id, &update).await?;

                tracing::info!(
                    user_id = %user_id,
                    session_id = %session_id,
                    customer_id = ?customer_id,
                    "Upgraded user after checkout"
                );
            }

            WebhookEvent::SubscriptionCreated {
                subscription_id,
                customer_id,
                ..
            } => {
                self.store
                    .create_subscription(&NewSubscription {
                        user_id: user_id.clone(),
                        stripe_subscription_id: subscription_id.clone(),
                        stripe_customer_id: customer_id.clone(),
                    })
                    .await?;

                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %subscription_id,
                    "Recorded subscription"
                );
            }

            WebhookEvent::SubscriptionUpdated {
                subscription_id,
                status,
                ..
            } => {
                let plan = match status {
                    SubscriptionStatus::Active => Plan::Paid,
                    SubscriptionStatus::Canceled | SubscriptionStatus::Unpaid => Plan::Free,
                    _ => {
                        tracing::debug!(
                            user_id = %user_id,
                            subscription_id = %subscription_id,
                            status = ?status,
                            "Subscription status needs no plan change"
                        );
                        return Ok(parsed);
                    }
                };

                self.store
                    .update_user(&user_id, &UserUpdate::plan(plan))
                    .await?;

                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %subscription_id,
                    status = ?status,
                    plan = plan.as_str(),
                    "Updated plan from subscription status"
                );
            }

            WebhookEvent::SubscriptionDeleted {
                subscription_id, ..
            } => {
                self.store
                    .update_user(&user_id, &UserUpdate::plan(Plan::Free))
                    .await?;
                let removed = self.store.delete_subscriptions(subscription_id).await?;

                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %subscription_id,
                    removed,
                    "Downgraded user after subscription deletion"
                );
            }

            WebhookEvent::Other { .. } => {}
        }

        Ok(parsed)
    }
}
