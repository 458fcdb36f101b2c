pub mod credential;
pub mod firebase;
pub mod memory;
pub mod oauth;

pub use credential::Credential;
pub use firebase::{FirebaseConfig, FirebaseStore};
pub use memory::MemoryStore;
pub use oauth::{ServiceAccountKey, TokenCache, TokenEndpoint};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Write rejected {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Remote location holding the latest value for a key.
///
/// `set` replaces whatever is stored at `path`; nothing is merged.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn set(&self, path: &str, value: &serde_json::Value) -> Result<(), StoreError>;
}
