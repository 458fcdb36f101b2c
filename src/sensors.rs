use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// Stationary reference point, not sampled
pub const LATITUDE: f64 = 36.806389;
pub const LONGITUDE: f64 = 10.181667;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Closed interval a simulated reading is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRange {
    pub min: f64,
    pub max: f64,
}

impl SensorRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const ALTITUDE_RANGE: SensorRange = SensorRange::new(10.0, 60.0);
pub const TEMPERATURE_RANGE: SensorRange = SensorRange::new(20.0, 80.0);
pub const HUMIDITY_RANGE: SensorRange = SensorRange::new(20.0, 90.0);
pub const SPEED_RANGE: SensorRange = SensorRange::new(0.0, 120.0);
pub const BATTERY_RANGE: SensorRange = SensorRange::new(40.0, 100.0);

/// One simulated set of vehicle readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub speed: f64,          // km/h, 0 means parked
    pub battery: f64,        // percent
    pub timestamp: String,
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug)]
pub struct ReadingGenerator<R = StdRng> {
    rng: R,
}

impl ReadingGenerator<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for ReadingGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> ReadingGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Samples a snapshot stamped with the current local time.
    pub fn generate(&mut self) -> SensorSnapshot {
        self.generate_at(Local::now().naive_local())
    }

    /// Samples a snapshot stamped with `at`.
    ///
    /// Each bounded field is drawn independently from a uniform distribution
    /// over its closed range. Bounds are whole numbers, so rounding never
    /// leaves the range.
    pub fn generate_at(&mut self, at: NaiveDateTime) -> SensorSnapshot {
        let temperature = self.sample(TEMPERATURE_RANGE);
        let humidity = self.sample(HUMIDITY_RANGE);
        let altitude = self.sample(ALTITUDE_RANGE);
        let speed = self.sample(SPEED_RANGE);
        let battery = self.sample(BATTERY_RANGE);

        SensorSnapshot {
            latitude: LATITUDE,
            longitude: LONGITUDE,
            altitude,
            temperature,
            humidity,
            speed,
            battery,
            timestamp: format_timestamp(&at),
        }
    }

    fn sample(&mut self, range: SensorRange) -> f64 {
        round2(self.rng.gen_range(range.min..=range.max))
    }
}
