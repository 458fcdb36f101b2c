use crate::config::PublisherConfig;
use crate::record::VehicleRecord;
use crate::sensors::ReadingGenerator;
use crate::status::DerivedStatus;
use crate::store::{RecordStore, StoreError};
use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Cycle {cycle}: failed to serialize record: {source}")]
    Serialization {
        cycle: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cycle {cycle}: store write failed: {source}")]
    Store {
        cycle: u64,
        #[source]
        source: StoreError,
    },
}

impl PublishError {
    pub fn cycle(&self) -> u64 {
        match self {
            PublishError::Serialization { cycle, .. } | PublishError::Store { cycle, .. } => *cycle,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub cycles_completed: u64,
    pub last_timestamp: Option<String>,
}

/// Creates a linked trigger and signal for stopping [`Publisher::run`].
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), ShutdownSignal(rx))
}

#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // No receivers left means nobody is running
        let _ = self.0.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the trigger fires. Pends forever if the trigger is
    /// dropped without firing.
    pub async fn triggered(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Generates, derives and publishes one vehicle record per cycle.
pub struct Publisher<S, R = StdRng> {
    store: S,
    generator: ReadingGenerator<R>,
    config: PublisherConfig,
    stats: PublisherStats,
}

impl<S: RecordStore> Publisher<S, StdRng> {
    pub fn new(store: S, config: PublisherConfig) -> Self {
        Self::with_generator(store, ReadingGenerator::new(), config)
    }
}

impl<S: RecordStore, R: Rng> Publisher<S, R> {
    pub fn with_generator(store: S, generator: ReadingGenerator<R>, config: PublisherConfig) -> Self {
        Self {
            store,
            generator,
            config,
            stats: PublisherStats::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn stats(&self) -> &PublisherStats {
        &self.stats
    }

    /// Runs one generate, derive, write and report cycle.
    ///
    /// The record replaces whatever is stored under the vehicle id. A failed
    /// write is returned as is; nothing is retried.
    pub async fn run_cycle(&mut self) -> Result<VehicleRecord, PublishError> {
        let cycle = self.stats.cycles_completed + 1;

        let snapshot = self.generator.generate();
        let status = DerivedStatus::from_snapshot(&snapshot);
        let record = VehicleRecord::assemble(snapshot, status);

        let value = record
            .to_json()
            .map_err(|source| PublishError::Serialization { cycle, source })?;
        self.store
            .set(&self.config.vehicle_id, &value)
            .await
            .map_err(|source| PublishError::Store { cycle, source })?;

        println!("{}", record.console_line());
        debug!(
            cycle,
            engine = %record.engine_state,
            led = %record.led,
            "Record published to {}",
            self.config.vehicle_id
        );

        self.stats.cycles_completed = cycle;
        self.stats.last_timestamp = Some(record.timestamp.clone());
        Ok(record)
    }

    /// Repeats [`run_cycle`](Self::run_cycle) until `shutdown` fires or the
    /// configured cycle limit is reached.
    ///
    /// Each write is followed by an idle sleep of `config.interval`, so the
    /// period is the interval plus the time the cycle itself took.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> Result<PublisherStats, PublishError> {
        info!(
            "📡 Publishing {} every {:?} of idle time",
            self.config.vehicle_id, self.config.interval
        );

        loop {
            if shutdown.is_triggered() {
                info!("Shutdown requested");
                break;
            }
            if self.limit_reached() {
                break;
            }

            self.run_cycle().await?;

            if self.limit_reached() {
                info!("Cycle limit of {} reached", self.stats.cycles_completed);
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                () = shutdown.triggered() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        Ok(self.stats.clone())
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_cycles
            .is_some_and(|max| self.stats.cycles_completed >= max)
    }
}
