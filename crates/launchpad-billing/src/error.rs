//! Billing Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, BillingError>;

/// Billing-related errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// No user record for the given identifier or email
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Unique constraint violated in the store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    /// True for failures that mean the webhook request itself is untrustworthy
    pub fn is_rejected_webhook(&self) -> bool {
        matches!(
            self,
            BillingError::WebhookSignature(_) | BillingError::WebhookParse(_)
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            BillingError::Stripe(_) => "Failed to create checkout session",
            BillingError::WebhookSignature(_) | BillingError::WebhookParse(_) => {
                "Invalid signature"
            }
            BillingError::UserNotFound(_) => "User not found",
            BillingError::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                BillingError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                BillingError::UserNotFound(db.message().to_string())
            }
            _ => BillingError::Storage(err.to_string()),
        }
    }
}
