//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_PRICE_ID` - Price id of the subscription sold on the page
//! - `STRIPE_WEBHOOK_SECRET` - Signing secret of the webhook endpoint
//! - `APP_BASE_URL` - Public URL of the landing page (redirect target)
//! - `AUTH_SECRET` - HS256 secret that signs session tokens
//!
//! ## Optional
//! - `DATABASE_URL` - `PostgreSQL` connection string (default: in-memory store)
//! - `BIND_ADDR` - Listen address (default: 0.0.0.0:3000)
//! - `STATIC_DIR` - Directory with the built landing page (default: static)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Max webhook age (default: 300)

use secrecy::SecretString;
use thiserror::Error;

use launchpad_billing::DEFAULT_TOLERANCE_SECS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub stripe: StripeConfig,
    pub base_url: String,
    pub auth_secret: SecretString,
    pub database_url: Option<SecretString>,
    pub bind_addr: String,
    pub static_dir: String,
}

/// Stripe settings
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub price_id: String,
    pub webhook_secret: SecretString,
    pub webhook_tolerance_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let base_url = required("APP_BASE_URL")?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidEnvVar(
                "APP_BASE_URL".into(),
                "must start with http:// or https://".into(),
            ));
        }

        let webhook_tolerance_secs = match lookup("STRIPE_WEBHOOK_TOLERANCE_SECS") {
            Some(raw) => raw.parse::<i64>().ok().filter(|v| *v > 0).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS".into(),
                    format!("expected positive seconds, got {raw:?}"),
                )
            })?,
            None => DEFAULT_TOLERANCE_SECS,
        };

        Ok(Self {
            stripe: StripeConfig {
                secret_key: SecretString::from(required("STRIPE_SECRET_KEY")?),
                price_id: required("STRIPE_PRICE_ID")?,
                webhook_secret: SecretString::from(required("STRIPE_WEBHOOK_SECRET")?),
                webhook_tolerance_secs,
            },
            base_url,
            auth_secret: SecretString::from(required("AUTH_SECRET")?),
            database_url: lookup("DATABASE_URL")
                .filter(|v| !v.is_empty())
                .map(SecretString::from),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "static".into()),
        })
    }
}
