//! # Vehicle Telemetry Simulator
//!
//! Simulates the sensors of a single vehicle and keeps a remote record of its
//! latest state up to date. Every cycle a fresh snapshot is sampled, two status
//! fields are derived from it, and the flattened record replaces the previous
//! value in a Firebase Realtime Database location.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vehsim::{MemoryStore, Publisher, PublisherConfig};
//! use vehsim::publisher::ShutdownSignal;
//!
//! # async fn example() -> Result<(), vehsim::PublishError> {
//! let store = MemoryStore::new();
//! let config = PublisherConfig { max_cycles: Some(3), ..PublisherConfig::default() };
//!
//! let mut publisher = Publisher::new(store.clone(), config);
//! let stats = publisher.run(ShutdownSignal::never()).await?;
//! println!("published {} records", stats.cycles_completed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`sensors`] - Simulated readings
//! - [`status`] - Engine state and LED color rules
//! - [`record`] - The flat record and its console summary
//! - [`store`] - Remote store seam with Firebase and in-memory backends
//! - [`config`] - Defaults and validation
//! - [`publisher`] - The publish loop and its shutdown signal

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod publisher;
pub mod record;
pub mod sensors;
pub mod status;
pub mod store;

// Re-export main public types for convenience
pub use config::PublisherConfig;
pub use publisher::{PublishError, Publisher, PublisherStats};
pub use record::VehicleRecord;
pub use sensors::{ReadingGenerator, SensorSnapshot};
pub use status::{DerivedStatus, EngineState, LedColor};
pub use store::{Credential, FirebaseStore, MemoryStore, RecordStore, StoreError};
