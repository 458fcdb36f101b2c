//! Google service-account OAuth2 flow.
//!
//! A service-account key signs an RS256 JWT assertion, which the key's
//! `token_uri` exchanges for a short-lived access token. [`TokenCache`] keeps
//! the current token and fetches a new one shortly before it expires, so a
//! publisher can run for longer than a single token lifetime.

use super::StoreError;
use core::fmt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";
pub const FIREBASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Fetch a new token this long before the current one expires
pub const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account key file this crate uses.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub kind: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccountKey {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.kind != SERVICE_ACCOUNT_TYPE {
            return Err(StoreError::Credential(format!(
                "unsupported credential type {:?}",
                self.kind
            )));
        }
        if self.client_email.trim().is_empty() {
            return Err(StoreError::Credential("service account has no client_email".into()));
        }
        self.encoding_key().map(|_| ())
    }

    fn encoding_key(&self) -> Result<EncodingKey, StoreError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            StoreError::Credential(format!("invalid private key for {}: {}", self.client_email, e))
        })
    }

    /// Signs the JWT assertion exchanged for an access token.
    pub fn signed_assertion(&self, now: i64) -> Result<String, StoreError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: FIREBASE_SCOPES.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&header, &claims, &self.encoding_key()?)
            .map_err(|e| StoreError::Credential(format!("cannot sign assertion: {}", e)))
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Source of fresh access tokens.
pub trait TokenEndpoint: Send + Sync {
    fn fetch(&self, now: i64) -> Result<AccessToken, StoreError>;
}

/// Exchanges signed assertions at the key's `token_uri`.
pub struct ServiceAccountEndpoint {
    key: ServiceAccountKey,
    agent: ureq::Agent,
}

impl ServiceAccountEndpoint {
    pub fn new(key: ServiceAccountKey, agent: ureq::Agent) -> Self {
        Self { key, agent }
    }
}

impl TokenEndpoint for ServiceAccountEndpoint {
    fn fetch(&self, now: i64) -> Result<AccessToken, StoreError> {
        let assertion = self.key.signed_assertion(now)?;

        let response = self
            .agent
            .post(&self.key.token_uri)
            .send_form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => StoreError::Auth {
                    status,
                    message: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => StoreError::Transport(transport.to_string()),
            })?;

        let body = response
            .into_string()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(format!("bad token response: {}", e)))
    }
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Current access token, refreshed [`REFRESH_MARGIN_SECS`] before expiry.
pub struct TokenCache<E> {
    endpoint: E,
    cached: Mutex<Option<CachedToken>>,
}

impl<E: TokenEndpoint> TokenCache<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            cached: Mutex::new(None),
        }
    }

    pub fn token(&self) -> Result<String, StoreError> {
        self.token_at(chrono::Utc::now().timestamp())
    }

    /// Token valid at `now` (unix seconds), fetching one if needed.
    pub fn token_at(&self, now: i64) -> Result<String, StoreError> {
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(current) = cached.as_ref() {
            if now + REFRESH_MARGIN_SECS < current.expires_at {
                return Ok(current.access_token.clone());
            }
        }

        let fresh = self.endpoint.fetch(now)?;
        debug!("Fetched access token valid for {}s", fresh.expires_in);
        let token = fresh.access_token.clone();
        *cached = Some(CachedToken {
            access_token: fresh.access_token,
            expires_at: now + fresh.expires_in,
        });
        Ok(token)
    }
}
