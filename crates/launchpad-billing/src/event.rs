//! Stripe Webhook Events
//!
//! The subset of Stripe's event payloads the reconciler reads. Only the
//! fields we act on are modelled; everything else in the payload is ignored,
//! so new Stripe API versions keep parsing.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{BillingError, Result};

/// Metadata key carrying our user id on sessions and subscriptions
pub const METADATA_USER_ID: &str = "userId";

/// Metadata key carrying the user's email
pub const METADATA_EMAIL: &str = "email";

/// Event envelope as delivered by Stripe
#[derive(Clone, Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds
    #[serde(default)]
    pub created: i64,

    pub data: EventData,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Parse a raw, already verified payload
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| BillingError::WebhookParse(e.to_string()))
    }
}

/// A reference Stripe may send either as an id or as the expanded object
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) | Expandable::Object { id } => id,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    #[serde(default)]
    customer: Option<Expandable>,
    /// Stripe sends `null` for sessions created without metadata
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    customer: Expandable,
    status: SubscriptionStatus,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

/// Stripe subscription status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Unpaid,
    PastDue,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Paused,
    #[serde(other)]
    Other,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// `checkout.session.completed`
    CheckoutCompleted {
        session_id: String,
        customer_id: Option<String>,
        user_id: Option<String>,
    },

    /// `customer.subscription.created`
    SubscriptionCreated {
        subscription_id: String,
        customer_id: String,
        user_id: Option<String>,
    },

    /// `customer.subscription.updated`
    SubscriptionUpdated {
        subscription_id: String,
        status: SubscriptionStatus,
        user_id: Option<String>,
    },

    /// `customer.subscription.deleted`
    SubscriptionDeleted {
        subscription_id: String,
        user_id: Option<String>,
    },

    /// Unhandled event type
    Other { event_type: String },
}

impl WebhookEvent {
    /// User id carried in metadata, if the event has one
    pub fn user_id(&self) -> Option<&str> {
        match self {
            WebhookEvent::CheckoutCompleted { user_id, .. }
            | WebhookEvent::SubscriptionCreated { user_id, .. }
            | WebhookEvent::SubscriptionUpdated { user_id, .. }
            | WebhookEvent::SubscriptionDeleted { user_id, .. } => user_id.as_deref(),
            WebhookEvent::Other { .. } => None,
        }
    }
}

fn user_id_from(metadata: Option<&HashMap<String, String>>) -> Option<String> {
    metadata?
        .get(METADATA_USER_ID)
        .filter(|id| !id.is_empty())
        .cloned()
}

fn object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T> {
    T::deserialize(&event.data.object).map_err(|e| {
        BillingError::WebhookParse(format!("{} payload: {e}", event.event_type))
    })
}

impl TryFrom<&StripeEvent> for WebhookEvent {
    type Error = BillingError;

    fn try_from(event: &StripeEvent) -> Result<Self> {
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = object(event)?;
                Ok(WebhookEvent::CheckoutCompleted {
                    user_id: user_id_from(session.metadata.as_ref()),
                    customer_id: session.customer.map(|c| c.id().to_string()),
                    session_id: session.id,
                })
            }

            "customer.subscription.created" => {
                let sub: SubscriptionObject = object(event)?;
                Ok(WebhookEvent::SubscriptionCreated {
                    user_id: user_id_from(sub.metadata.as_ref()),
                    customer_id: sub.customer.id().to_string(),
                    subscription_id: sub.id,
                })
            }

            "customer.subscription.updated" => {
                let sub: SubscriptionObject = object(event)?;
                Ok(WebhookEvent::SubscriptionUpdated {
                    user_id: user_id_from(sub.metadata.as_ref()),
                    status: sub.status,
                    subscription_id: sub.id,
                })
            }

            "customer.subscription.deleted" => {
                let sub: SubscriptionObject = object(event)?;
                Ok(WebhookEvent::SubscriptionDeleted {
                    user_id: user_id_from(sub.metadata.as_ref()),
                    subscription_id: sub.id,
                })
            }

            other => Ok(WebhookEvent::Other {
                event_type: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: serde_json::Value) -> StripeEvent {
        let raw = json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_700_000_000,
            "livemode": false,
            "data": { "object": object },
        });
        StripeEvent::from_slice(raw.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_checkout_completed() {
        let event = envelope(
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "object": "checkout.session",
                "customer": "cus_1",
                "metadata": { "userId": "u1", "email": "a@example.com" },
            }),
        );

        assert_eq!(
            WebhookEvent::try_from(&event).unwrap(),
            WebhookEvent::CheckoutCompleted {
                session_id: "cs_1".into(),
                customer_id: Some("cus_1".into()),
                user_id: Some("u1".into()),
            }
        );
    }

    #[test]
    fn test_expanded_customer() {
        let event = envelope(
            "customer.subscription.created",
            json!({
                "id": "sub_1",
                "customer": { "id": "cus_9", "object": "customer" },
                "status": "incomplete",
                "metadata": {},
            }),
        );

        let parsed = WebhookEvent::try_from(&event).unwrap();
        assert_eq!(
            parsed,
            WebhookEvent::SubscriptionCreated {
                subscription_id: "sub_1".into(),
                customer_id: "cus_9".into(),
                user_id: None,
            }
        );
        assert_eq!(parsed.user_id(), None);
    }

    #[test]
    fn test_unknown_status() {
        let event = envelope(
            "customer.subscription.updated",
            json!({
                "id": "sub_1",
                "customer": "cus_1",
                "status": "some_future_status",
                "metadata": { "userId": "u1" },
            }),
        );

        match WebhookEvent::try_from(&event).unwrap() {
            WebhookEvent::SubscriptionUpdated { status, .. } => {
                assert_eq!(status, SubscriptionStatus::Other);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unhandled_type() {
        let event = envelope("invoice.paid", json!({ "id": "in_1" }));
        assert_eq!(
            WebhookEvent::try_from(&event).unwrap(),
            WebhookEvent::Other {
                event_type: "invoice.paid".into()
            }
        );
    }

    #[test]
    fn test_malformed_object() {
        let event = envelope("customer.subscription.deleted", json!({ "id": 42 }));
        assert!(matches!(
            WebhookEvent::try_from(&event),
            Err(BillingError::WebhookParse(_))
        ));
    }

    #[test]
    fn test_empty_user_id_is_absent() {
        let event = envelope(
            "checkout.session.completed",
            json!({ "id": "cs_1", "customer": null, "metadata": { "userId": "" } }),
        );
        assert_eq!(WebhookEvent::try_from(&event).unwrap().user_id(), None);
    }

    #[test]
    fn test_null_metadata_is_absent() {
        let session = envelope(
            "checkout.session.completed",
            json!({ "id": "cs_1", "customer": "cus_1", "metadata": null }),
        );
        assert_eq!(
            WebhookEvent::try_from(&session).unwrap(),
            WebhookEvent::CheckoutCompleted {
                session_id: "cs_1".into(),
                customer_id: Some("cus_1".into()),
                user_id: None,
            }
        );

        let subscription = envelope(
            "customer.subscription.deleted",
            json!({ "id": "sub_1", "customer": "cus_1", "status": "canceled", "metadata": null }),
        );
        assert_eq!(WebhookEvent::try_from(&subscription).unwrap().user_id(), None);

        let missing = envelope(
            "customer.subscription.updated",
            json!({ "id": "sub_1", "customer": "cus_1", "status": "active" }),
        );
        assert_eq!(WebhookEvent::try_from(&missing).unwrap().user_id(), None);
    }

    #[test]
    fn test_envelope_requires_json() {
        assert!(StripeEvent::from_slice(b"not json").is_err());
    }
}
