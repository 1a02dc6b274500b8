//! PostgreSQL Account Store
//!
//! `sqlx` implementation of [`AccountStore`]. Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::account::{AccountStore, NewSubscription, Plan, Subscription, User, UserId, UserUpdate};
use crate::error::{BillingError, Result};

const USER_COLUMNS: &str =
    "id, email, plan, usage_limit, stripe_customer_id, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, stripe_subscription_id, stripe_customer_id, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    plan: String,
    usage_limit: i32,
    stripe_customer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = BillingError;

    fn try_from(row: UserRow) -> Result<Self> {
        let plan = Plan::parse(&row.plan).ok_or_else(|| {
            BillingError::Storage(format!("unknown plan {:?} for user {}", row.plan, row.id))
        })?;

        Ok(User {
            id: UserId::from_string(row.id),
            email: row.email,
            plan,
            usage_limit: row.usage_limit,
            stripe_customer_id: row.stripe_customer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    user_id: String,
    stripe_subscription_id: String,
    stripe_customer_id: String,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            user_id: UserId::from_string(row.user_id),
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_customer_id: row.stripe_customer_id,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed account store
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BillingError::Storage(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create_user(&self, email: &str) -> Result<User> {
        let user = User::new(email);
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (id, email, plan, usage_limit) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id.as_str())
        .bind(&user.email)
        .bind(user.plan.as_str())
        .bind(user.usage_limit)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET \
                 plan = COALESCE($2, plan), \
                 usage_limit = COALESCE($3, usage_limit), \
                 stripe_customer_id = CASE WHEN $4 THEN $5 ELSE stripe_customer_id END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(update.plan.map(|p| p.as_str()))
        .bind(update.plan.map(|p| p.usage_limit()))
        .bind(update.stripe_customer_id.is_some())
        .bind(update.stripe_customer_id.as_ref().and_then(|c| c.as_deref()))
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| BillingError::UserNotFound(id.to_string()))?
            .try_into()
    }

    async fn delete_user(&self, id: &UserId) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_subscription(&self, new: &NewSubscription) -> Result<Subscription> {
        let row: SubscriptionRow = sqlx::query_as(&format!(
            "INSERT INTO subscriptions (id, user_id, stripe_subscription_id, stripe_customer_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(new.user_id.as_str())
        .bind(&new.stripe_subscription_id)
        .bind(&new.stripe_customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete_subscriptions(&self, stripe_subscription_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE stripe_subscription_id = $1")
            .bind(stripe_subscription_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_subscriptions(&self, user_id: &UserId) -> Result<Vec<Subscription>> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_unknown_plan_is_rejected() {
        let now = Utc::now();
        let row = UserRow {
            id: "u1".into(),
            email: "a@example.com".into(),
            plan: "Enterprise".into(),
            usage_limit: 3,
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(User::try_from(row), Err(BillingError::Storage(_))));
    }
}
