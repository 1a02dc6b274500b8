//! Account Records
//!
//! Users, their plan entitlement, and the Stripe subscriptions linked to them.
//! [`AccountStore`] is the persistence seam; [`MemoryAccountStore`] backs
//! development and tests, `PgAccountStore` backs production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{BillingError, Result};

/// Usage quota granted to free accounts.
pub const FREE_USAGE_LIMIT: i32 = 3;

/// Stand-in for "no practical limit". Compared as an ordinary integer quota,
/// so it must stay larger than any realistic usage count.
pub const UNLIMITED_USAGE_LIMIT: i32 = 999_999;

/// User identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a new random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Entitlement tier
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plan {
    #[default]
    Free,
    Paid,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Paid => "Paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Free" => Some(Plan::Free),
            "Paid" => Some(Plan::Paid),
            _ => None,
        }
    }

    /// Usage quota that accompanies this plan
    pub fn usage_limit(&self) -> i32 {
        match self {
            Plan::Free => FREE_USAGE_LIMIT,
            Plan::Paid => UNLIMITED_USAGE_LIMIT,
        }
    }
}

/// A user record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Unique; correlates the account with Stripe customers
    pub email: String,

    pub plan: Plan,

    /// Always equal to `plan.usage_limit()`
    pub usage_limit: i32,

    /// Stripe customer id, set once a checkout completes
    pub stripe_customer_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a free-tier user
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            email: email.into(),
            plan: Plan::Free,
            usage_limit: Plan::Free.usage_limit(),
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update in place, keeping the quota in step with the plan
    pub fn apply(&mut self, update: &UserUpdate) {
        if let Some(plan) = update.plan {
            self.plan = plan;
            self.usage_limit = plan.usage_limit();
        }
        if let Some(ref customer) = update.stripe_customer_id {
            self.stripe_customer_id.clone_from(customer);
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of a user. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub plan: Option<Plan>,

    /// `Some(None)` clears the stored customer reference
    pub stripe_customer_id: Option<Option<String>>,
}

impl UserUpdate {
    pub fn plan(plan: Plan) -> Self {
        Self {
            plan: Some(plan),
            ..Default::default()
        }
    }

    /// Overwrite the customer reference, clearing it when `None`
    pub fn with_customer(mut self, customer_id: Option<String>) -> Self {
        self.stripe_customer_id = Some(customer_id);
        self
    }
}

/// A Stripe subscription linked to a user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: UserId,

    /// Unique per store
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,

    pub created_at: DateTime<Utc>,
}

/// Fields needed to record a new subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
}

/// Account storage trait
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Short backend name for diagnostics
    fn backend(&self) -> &'static str;

    /// Create a free-tier user. Fails with `Conflict` if the email is taken.
    async fn create_user(&self, email: &str) -> Result<User>;

    async fn find_user(&self, id: &UserId) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update a user. Fails with `UserNotFound` if no such user exists.
    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<User>;

    async fn delete_user(&self, id: &UserId) -> Result<()>;

    /// Fails with `Conflict` if the Stripe subscription id is already recorded.
    async fn create_subscription(&self, new: &NewSubscription) -> Result<Subscription>;

    /// Delete every subscription with this Stripe id, returning how many went
    async fn delete_subscriptions(&self, stripe_subscription_id: &str) -> Result<u64>;

    async fn list_subscriptions(&self, user_id: &UserId) -> Result<Vec<Subscription>>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
    subscriptions: Vec<Subscription>,
}

/// In-memory account store (for development)
#[derive(Default)]
pub struct MemoryAccountStore {
    state: RwLock<MemoryState>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, email: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if state.by_email.contains_key(email) {
            return Err(BillingError::Conflict(format!("email {email} already registered")));
        }

        let user = User::new(email);
        state.by_email.insert(user.email.clone(), user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .by_email
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| BillingError::UserNotFound(id.to_string()))?;
        user.apply(update);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.remove(id) {
            state.by_email.remove(&user.email);
            state.subscriptions.retain(|s| &s.user_id != id);
        }
        Ok(())
    }

    async fn create_subscription(&self, new: &NewSubscription) -> Result<Subscription> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new.user_id) {
            return Err(BillingError::UserNotFound(new.user_id.to_string()));
        }
        if state
            .subscriptions
            .iter()
            .any(|s| s.stripe_subscription_id == new.stripe_subscription_id)
        {
            return Err(BillingError::Conflict(format!(
                "subscription {} already recorded",
                new.stripe_subscription_id
            )));
        }

        let subscription = Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            stripe_subscription_id: new.stripe_subscription_id.clone(),
            stripe_customer_id: new.stripe_customer_id.clone(),
            created_at: Utc::now(),
        };
        state.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn delete_subscriptions(&self, stripe_subscription_id: &str) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.subscriptions.len();
        state
            .subscriptions
            .retain(|s| s.stripe_subscription_id != stripe_subscription_id);
        Ok((before - state.subscriptions.len()) as u64)
    }

    async fn list_subscriptions(&self, user_id: &UserId) -> Result<Vec<Subscription>> {
        Ok(self
            .state
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits() {
        assert_eq!(Plan::Free.usage_limit(), 3);
        assert_eq!(Plan::Paid.usage_limit(), UNLIMITED_USAGE_LIMIT);
        assert_eq!(Plan::parse("Paid"), Some(Plan::Paid));
        assert_eq!(Plan::parse("paid"), None);
    }

    #[test]
    fn test_update_keeps_limit_in_step() {
        let mut user = User::new("test@example.com");
        user.apply(&UserUpdate::plan(Plan::Paid).with_customer(Some("cus_1".into())));
        assert_eq!(user.plan, Plan::Paid);
        assert_eq!(user.usage_limit, UNLIMITED_USAGE_LIMIT);
        assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_1"));

        // Downgrading leaves the customer reference alone
        user.apply(&UserUpdate::plan(Plan::Free));
        assert_eq!(user.usage_limit, FREE_USAGE_LIMIT);
        assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_1"));

        user.apply(&UserUpdate::plan(Plan::Paid).with_customer(None));
        assert_eq!(user.stripe_customer_id, None);
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = MemoryAccountStore::new();
        let user = store.create_user("a@example.com").await.unwrap();
        assert_eq!(user.plan, Plan::Free);

        let by_email = store.find_user_by_email("a@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id.clone()));
        assert!(store.find_user_by_email("b@example.com").await.unwrap().is_none());

        let dup = store.create_user("a@example.com").await;
        assert!(matches!(dup, Err(BillingError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = MemoryAccountStore::new();
        let result = store
            .update_user(&UserId::from_string("nope"), &UserUpdate::plan(Plan::Paid))
            .await;
        assert!(matches!(result, Err(BillingError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let store = MemoryAccountStore::new();
        let user = store.create_user("a@example.com").await.unwrap();
        let new = NewSubscription {
            user_id: user.id.clone(),
            stripe_subscription_id: "sub_123".into(),
            stripe_customer_id: "cus_1".into(),
        };

        store.create_subscription(&new).await.unwrap();
        assert!(matches!(
            store.create_subscription(&new).await,
            Err(BillingError::Conflict(_))
        ));
        assert_eq!(store.list_subscriptions(&user.id).await.unwrap().len(), 1);

        assert_eq!(store.delete_subscriptions("sub_123").await.unwrap(), 1);
        assert_eq!(store.delete_subscriptions("sub_123").await.unwrap(), 0);
        assert!(store.list_subscriptions(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_drops_subscriptions() {
        let store = MemoryAccountStore::new();
        let user = store.create_user("a@example.com").await.unwrap();
        store
            .create_subscription(&NewSubscription {
                user_id: user.id.clone(),
                stripe_subscription_id: "sub_9".into(),
                stripe_customer_id: "cus_9".into(),
            })
            .await
            .unwrap();

        store.delete_user(&user.id).await.unwrap();
        assert!(store.find_user(&user.id).await.unwrap().is_none());
        assert_eq!(store.delete_subscriptions("sub_9").await.unwrap(), 0);
    }
}
