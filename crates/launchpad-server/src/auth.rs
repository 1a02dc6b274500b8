//! Session authentication
//!
//! Sessions are HS256 JWTs signed with `AUTH_SECRET`. The token is read from
//! `Authorization: Bearer <token>` or, for browser requests, the
//! `session_token` cookie.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

/// Verification keys for session tokens
#[derive(Clone)]
pub struct SessionKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

/// Caller identity resolved from a valid session carrying an email
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub email: String,
    pub subject: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    Arc<SessionKeys>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<SessionKeys>::from_ref(state);

        let token = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or(ApiError::Unauthorized)?;

        let claims = keys.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            ApiError::Unauthorized
        })?;

        let email = claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthSession {
            email,
            subject: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-auth-secret";

    fn token(email: Option<&str>, exp_offset: i64) -> String {
        let claims = SessionClaims {
            sub: Some("u1".into()),
            email: email.map(String::from),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn test_verify_roundtrip() {
        let keys = SessionKeys::new(SECRET);
        let claims = keys.verify(&token(Some("a@example.com"), 3600)).unwrap();
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_rejects_expired_and_foreign_tokens() {
        let keys = SessionKeys::new(SECRET);
        assert!(keys.verify(&token(Some("a@example.com"), -3600)).is_err());

        let other = SessionKeys::new(b"another-secret");
        assert!(other.verify(&token(Some("a@example.com"), 3600)).is_err());
        assert!(keys.verify("not-a-jwt").is_err());
    }

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session_token=abc"));
        assert_eq!(cookie_token(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
