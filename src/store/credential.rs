use super::oauth::ServiceAccountKey;
use super::StoreError;
use core::fmt;
use serde::Deserialize;
use std::path::Path;

/// Secret used to authenticate database writes.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Legacy database secret, sent as `auth=`.
    DatabaseSecret(String),
    /// OAuth2 access token, sent as `access_token=` and never refreshed.
    AccessToken(String),
    /// Google service-account key; access tokens are minted and refreshed from it.
    ServiceAccount(ServiceAccountKey),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CredentialFile {
    Secret { database_secret: String },
    Token { access_token: String },
    ServiceAccount(ServiceAccountKey),
}

impl Credential {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Credential(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, StoreError> {
        let file: CredentialFile = serde_json::from_str(contents)
            .map_err(|e| StoreError::Credential(format!("unrecognized credential file: {}", e)))?;

        let credential = match file {
            CredentialFile::Secret { database_secret } => Credential::DatabaseSecret(database_secret),
            CredentialFile::Token { access_token } => Credential::AccessToken(access_token),
            CredentialFile::ServiceAccount(key) => {
                key.validate()?;
                return Ok(Credential::ServiceAccount(key));
            }
        };

        if credential.static_query_param().is_some_and(|(_, secret)| secret.trim().is_empty()) {
            return Err(StoreError::Credential("credential is empty".into()));
        }
        Ok(credential)
    }

    /// Query parameter for credentials that never change.
    pub fn static_query_param(&self) -> Option<(&'static str, &str)> {
        match self {
            Credential::DatabaseSecret(secret) => Some(("auth", secret)),
            Credential::AccessToken(token) => Some(("access_token", token)),
            Credential::ServiceAccount(_) => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::DatabaseSecret(_) => f.write_str("DatabaseSecret(<redacted>)"),
            Credential::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            Credential::ServiceAccount(key) => write!(f, "ServiceAccount({})", key.client_email),
        }
    }
}
