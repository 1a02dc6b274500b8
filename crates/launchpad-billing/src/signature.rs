//! Stripe Webhook Signatures
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends the
//! result in the `Stripe-Signature` header:
//!
//! ```text
//! Stripe-Signature: t=1704067200,v1=5257a869e7ec...,v0=6ffbb59b2300...
//! ```
//!
//! Verification must run over the exact bytes received. Re-serializing the
//! JSON first changes the bytes and breaks the signature.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{BillingError, Result};
use crate::event::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a signed payload, in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `Stripe-Signature` header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,

    /// All `v1` signatures, hex-decoded. Stripe sends several while a secret
    /// is being rolled.
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        BillingError::WebhookSignature(format!("invalid timestamp {value:?}"))
                    })?);
                }
                "v1" => {
                    // Undecodable entries can never match; skip rather than fail
                    if let Ok(bytes) = hex::decode(value) {
                        signatures.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| BillingError::WebhookSignature("missing timestamp".into()))?;
        if signatures.is_empty() {
            return Err(BillingError::WebhookSignature("no v1 signature".into()));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BillingError::Config(format!("webhook secret unusable: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex-encoded v1 signature for a payload
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
    Ok(hex::encode(
        mac_for(secret, timestamp, payload)?.finalize().into_bytes(),
    ))
}

/// Build a complete header value, as Stripe would send it
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
    Ok(format!(
        "t={timestamp},v1={}",
        compute_signature(secret, timestamp, payload)?
    ))
}

/// Verifies webhook payloads against the endpoint's signing secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"[REDACTED]")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verify the header against the raw payload at the current time
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    /// Verify the header against the raw payload as of `now` (unix seconds)
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let parsed = SignatureHeader::parse(header)?;

        let mut matched = false;
        for candidate in &parsed.signatures {
            let mac = mac_for(&self.secret, parsed.timestamp, payload)?;
            if mac.verify_slice(candidate).is_ok() {
                matched = true;
                break;
            }
        }
        if !matched {
            return Err(BillingError::WebhookSignature(
                "no signature matches the payload".into(),
            ));
        }

        let within_tolerance = now
            .checked_sub(parsed.timestamp)
            .map(i64::unsigned_abs)
            .zip(u64::try_from(self.tolerance_secs).ok())
            .is_some_and(|(age, tolerance)| age <= tolerance);
        if !within_tolerance {
            return Err(BillingError::WebhookSignature(format!(
                "timestamp {} outside tolerance of {}s",
                parsed.timestamp, self.tolerance_secs
            )));
        }

        Ok(())
    }

    /// Verify, then parse the envelope from the same bytes
    pub fn construct_event(&self, payload: &[u8], header: &str) -> Result<StripeEvent> {
        self.verify(payload, header)?;
        StripeEvent::from_slice(payload)
    }
}
