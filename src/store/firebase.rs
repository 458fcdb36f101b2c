//! Firebase Realtime Database store over the REST API.
//!
//! A write is `PUT {database_url}/{path}.json` with the JSON value as the body,
//! which replaces everything at that location. Authentication is a query
//! parameter built from the [`Credential`] loaded at startup: a fixed secret, or
//! an access token minted from a service-account key and refreshed as it expires.

use super::oauth::{ServiceAccountEndpoint, TokenCache};
use super::{Credential, RecordStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl FirebaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("vehsim/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

enum Authenticator {
    Static { param: &'static str, value: String },
    ServiceAccount {
        client_email: String,
        tokens: TokenCache<ServiceAccountEndpoint>,
    },
}

impl Authenticator {
    fn new(credential: Credential, agent: &ureq::Agent) -> Self {
        match credential {
            Credential::ServiceAccount(key) => Authenticator::ServiceAccount {
                client_email: key.client_email.clone(),
                tokens: TokenCache::new(ServiceAccountEndpoint::new(key, agent.clone())),
            },
            Credential::DatabaseSecret(value) => Authenticator::Static { param: "auth", value },
            Credential::AccessToken(value) => Authenticator::Static { param: "access_token", value },
        }
    }

    /// May block on a token exchange.
    fn query_param(&self) -> Result<(&'static str, String), StoreError> {
        match self {
            Authenticator::Static { param, value } => Ok((*param, value.clone())),
            Authenticator::ServiceAccount { tokens, .. } => Ok(("access_token", tokens.token()?)),
        }
    }
}

pub struct FirebaseStore {
    base_url: String,
    auth: Arc<Authenticator>,
    agent: ureq::Agent,
}

impl FirebaseStore {
    /// Builds the client once; every later write reuses this agent and credential.
    pub fn connect(config: FirebaseConfig, credential: Credential) -> Result<Self, StoreError> {
        let base_url = normalize_base_url(&config.database_url)?;

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        let auth = Arc::new(Authenticator::new(credential, &agent));

        debug!("Firebase store ready at {}", base_url);
        Ok(Self { base_url, auth, agent })
    }

    pub fn location_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

impl core::fmt::Debug for FirebaseStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let auth = match self.auth.as_ref() {
            Authenticator::Static { param, .. } => format!("{}=<redacted>", param),
            Authenticator::ServiceAccount { client_email, .. } => {
                format!("service account {}", client_email)
            }
        };
        f.debug_struct("FirebaseStore")
            .field("base_url", &self.base_url)
            .field("auth", &auth)
            .finish_non_exhaustive()
    }
}

fn normalize_base_url(url: &str) -> Result<String, StoreError> {
    let trimmed = url.trim().trim_end_matches('/');
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(StoreError::Config(format!(
            "database URL must start with http:// or https://, got {:?}",
            url
        )));
    }
    if trimmed.len() <= "https://".len() {
        return Err(StoreError::Config("database URL has no host".into()));
    }
    Ok(trimmed.to_string())
}

fn classify(error: ureq::Error) -> StoreError {
    match error {
        ureq::Error::Status(status, response) => {
            let message = response.into_string().unwrap_or_default();
            if status == 401 || status == 403 {
                StoreError::Auth { status, message }
            } else {
                StoreError::Rejected { status, message }
            }
        }
        ureq::Error::Transport(transport) => StoreError::Transport(transport.to_string()),
    }
}

#[async_trait]
impl RecordStore for FirebaseStore {
    async fn set(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let url = self.location_url(path);
        let body = serde_json::to_string(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let request = self
            .agent
            .put(&url)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json");
        let auth = Arc::clone(&self.auth);

        // ureq and the token exchange block; keep them off the runtime thread
        tokio::task::spawn_blocking(move || {
            let (param, secret) = auth.query_param()?;
            request
                .query(param, &secret)
                .send_string(&body)
                .map(|_| ())
                .map_err(classify)
        })
        .await
        .map_err(|e| StoreError::Transport(format!("write task failed: {}", e)))??;

        debug!("PUT {} ok", url);
        Ok(())
    }
}
