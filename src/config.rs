use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DATABASE_URL: &str = "https://iot-vehicules-default-rtdb.firebaseio.com/";
pub const VEHICLE_ID: &str = "vehicule1";
pub const CREDENTIAL_PATH: &str = "serviceAccountKey.json";
// Idle time after each write, not a fixed rate
pub const PUBLISH_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid database URL {0:?}: must start with http:// or https://")]
    InvalidUrl(String),

    #[error("Vehicle identifier must not be empty")]
    EmptyVehicleId,

    #[error("Vehicle identifier {0:?} contains characters not allowed in a database path")]
    InvalidVehicleId(String),

    #[error("Publish interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    pub database_url: String,
    pub credential_path: PathBuf,
    pub vehicle_id: String,
    pub interval: Duration,
    /// Stop after this many cycles; `None` runs until cancelled.
    pub max_cycles: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            database_url: DATABASE_URL.to_string(),
            credential_path: PathBuf::from(CREDENTIAL_PATH),
            vehicle_id: VEHICLE_ID.to_string(),
            interval: Duration::from_secs(PUBLISH_INTERVAL_SECS),
            max_cycles: None,
        }
    }
}

impl PublisherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.database_url.clone()));
        }

        if self.vehicle_id.is_empty() {
            return Err(ConfigError::EmptyVehicleId);
        }
        // Characters Firebase forbids in keys
        if self
            .vehicle_id
            .chars()
            .any(|c| matches!(c, '.' | '#' | '$' | '[' | ']') || c.is_control())
        {
            return Err(ConfigError::InvalidVehicleId(self.vehicle_id.clone()));
        }

        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}
