//! Short-lived access token cache.
//!
//! One instance per process, explicitly injected wherever a token is needed.
//! A token is valid only while `now < expires_at`, with a 300-second safety
//! buffer subtracted from the platform-reported lifetime so refresh happens
//! before the far side would reject. Refreshes are serialized behind the
//! slot's mutex: concurrent callers who find the token expired wait for one
//! exchange instead of racing their own.

use super::api::{TokenExchangeRequest, TokenEnvelope};
use crate::error::AuthError;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Safety margin subtracted from the reported token lifetime
const EXPIRY_BUFFER_SECS: i64 = 300;

/// Nominal lifetime assumed when the exchange reply omits one
const DEFAULT_LIFETIME_SECS: i64 = 7200;

#[derive(Clone, Debug)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

impl Credentials {
    /// Pull the credential pair from proxy settings.
    pub fn from_settings(settings: &config::ProxySettings) -> Result<Self, AuthError> {
        match (&settings.app_id, &settings.app_secret) {
            (Some(app_id), Some(app_secret)) => Ok(Credentials {
                app_id: app_id.clone(),
                app_secret: app_secret.clone(),
            }),
            _ => Err(AuthError::MissingCredentials),
        }
    }
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at_ms: i64,
}

impl CachedToken {
    fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Expiry instant for a token issued now with the reported lifetime.
fn expires_at_from(now_ms: i64, lifetime_secs: i64) -> i64 {
    now_ms + (lifetime_secs - EXPIRY_BUFFER_SECS) * 1000
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct TokenCache {
    http: reqwest::Client,
    auth_url: String,
    credentials: Option<Credentials>,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Cache that exchanges a held credential pair directly with the platform.
    pub fn with_credentials(auth_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::build(auth_url.into(), Some(credentials))
    }

    /// Cache that sends an empty exchange body and lets the far side (the
    /// credential proxy) resolve credentials itself.
    pub fn delegated(auth_url: impl Into<String>) -> Self {
        Self::build(auth_url.into(), None)
    }

    fn build(auth_url: String, credentials: Option<Credentials>) -> Self {
        TokenCache {
            http: reqwest::Client::new(),
            auth_url,
            credentials,
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token, refreshing it first if it has expired.
    /// The cache is only written on a successful exchange; failures leave
    /// whatever was cached untouched.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_valid_at(now_ms()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.exchange().await?;
        let value = token.value.clone();
        debug!(expires_at_ms = token.expires_at_ms, "access token refreshed");
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call performs a fresh exchange.
    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }

    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let body = match &self.credentials {
            Some(creds) => TokenExchangeRequest {
                app_id: Some(creds.app_id.clone()),
                app_secret: Some(creds.app_secret.clone()),
            },
            None => TokenExchangeRequest::default(),
        };

        let response = self
            .http
            .post(&self.auth_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Exchange(format!(
                "exchange rejected with status {}",
                response.status()
            )));
        }

        let envelope: TokenEnvelope = response
            .json()
            .await
            .map_err(|e| AuthError::Exchange(e.to_string()))?;

        accept_exchange(envelope, now_ms())
    }
}

/// Validate an exchange reply and compute the buffered expiry.
fn accept_exchange(envelope: TokenEnvelope, now_ms: i64) -> Result<CachedToken, AuthError> {
    if envelope.code != 0 {
        return Err(AuthError::Rejected {
            code: envelope.code,
            msg: envelope.msg,
        });
    }

    let value = envelope
        .tenant_access_token
        .ok_or_else(|| AuthError::Exchange("exchange reply carried no token".to_string()))?;
    let lifetime = envelope.expire.unwrap_or(DEFAULT_LIFETIME_SECS);

    Ok(CachedToken {
        value,
        expires_at_ms: expires_at_from(now_ms, lifetime),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_applies_the_buffer() {
        // A lifetime of L seconds expires at now + (L - 300)s, not now + L.
        let now = 1_000_000;
        assert_eq!(expires_at_from(now, 7200), now + 6900 * 1000);
    }

    #[test]
    fn token_is_invalid_at_the_buffered_instant() {
        let token = CachedToken {
            value: "t".into(),
            expires_at_ms: expires_at_from(0, 7200),
        };
        assert!(token.is_valid_at(6900 * 1000 - 1));
        assert!(!token.is_valid_at(6900 * 1000));
    }

    #[test]
    fn rejected_exchange_never_becomes_a_token() {
        let envelope = TokenEnvelope {
            code: 99991663,
            msg: "app secret invalid".into(),
            tenant_access_token: Some("should-not-be-used".into()),
            expire: Some(7200),
        };
        match accept_exchange(envelope, 0) {
            Err(AuthError::Rejected { code, .. }) => assert_eq!(code, 99991663),
            other => panic!("expected rejection, got {:?}", other.map(|t| t.value)),
        }
    }

    #[test]
    fn missing_lifetime_falls_back_to_the_nominal_one() {
        let envelope = TokenEnvelope {
            code: 0,
            msg: String::new(),
            tenant_access_token: Some("tok".into()),
            expire: None,
        };
        let token = accept_exchange(envelope, 0).unwrap();
        assert_eq!(token.expires_at_ms, expires_at_from(0, DEFAULT_LIFETIME_SECS));
    }

    #[tokio::test]
    async fn valid_cached_token_short_circuits_the_network() {
        // The auth URL is unroutable; a network attempt would error out.
        let cache = TokenCache::delegated("http://127.0.0.1:1/auth");
        *cache.slot.lock().await = Some(CachedToken {
            value: "cached".into(),
            expires_at_ms: now_ms() + 60_000,
        });

        assert_eq!(cache.get_token().await.unwrap(), "cached");
    }

    #[test]
    fn missing_credentials_is_an_auth_error() {
        let settings = config::ProxySettings::default();
        assert!(matches!(
            Credentials::from_settings(&settings),
            Err(AuthError::MissingCredentials)
        ));
    }
}
