use crate::sensors::SensorSnapshot;
use crate::status::{DerivedStatus, EngineState, LedColor};
use serde::{Deserialize, Serialize};

pub const RECORD_FIELD_COUNT: usize = 10;

/// Flat record written to the remote store, replacing the previous one.
///
/// Field order here is the serialized field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub speed: f64,
    pub battery: f64,
    pub engine_state: EngineState,
    pub led: LedColor,
    pub timestamp: String,
}

impl VehicleRecord {
    pub fn assemble(snapshot: SensorSnapshot, status: DerivedStatus) -> Self {
        Self {
            latitude: snapshot.latitude,
            longitude: snapshot.longitude,
            altitude: snapshot.altitude,
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
            speed: snapshot.speed,
            battery: snapshot.battery,
            engine_state: status.engine_state,
            led: status.led,
            timestamp: snapshot.timestamp,
        }
    }

    pub fn from_snapshot(snapshot: SensorSnapshot) -> Self {
        let status = DerivedStatus::from_snapshot(&snapshot);
        Self::assemble(snapshot, status)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// One-line console summary of the record.
    pub fn console_line(&self) -> String {
        format!(
            "[{}] Temp={}°C | Hum={}% | Speed={}km/h | Batt={}% | LED={}",
            self.timestamp,
            format_reading(self.temperature),
            format_reading(self.humidity),
            format_reading(self.speed),
            format_reading(self.battery),
            self.led,
        )
    }
}

/// Shortest round-trip form, keeping one decimal on whole numbers (`30.0`).
pub fn format_reading(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            latitude: 36.806389,
            longitude: 10.181667,
            altitude: 33.3,
            temperature: 70.0,
            humidity: 50.25,
            speed: 0.0,
            battery: 88.1,
            timestamp: "2024-03-09 07:05:03".to_string(),
        }
    }

    #[test]
    fn test_assemble_derives_status() {
        let record = VehicleRecord::from_snapshot(snapshot());
        assert_eq!(record.led, LedColor::Red);
        assert_eq!(record.engine_state, EngineState::Off);
        assert_eq!(record.altitude, 33.3);
    }

    #[test]
    fn test_console_line_format() {
        let record = VehicleRecord::from_snapshot(snapshot());
        assert_eq!(
            record.console_line(),
            "[2024-03-09 07:05:03] Temp=70.0°C | Hum=50.25% | Speed=0.0km/h | Batt=88.1% | LED=red"
        );
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(30.0), "30.0");
        assert_eq!(format_reading(45.5), "45.5");
        assert_eq!(format_reading(72.13), "72.13");
    }

    #[test]
    fn test_json_is_flat() {
        let value = VehicleRecord::from_snapshot(snapshot()).to_json().unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), RECORD_FIELD_COUNT);
        assert!(object.values().all(|v| !v.is_object() && !v.is_array()));
        assert_eq!(object["engine_state"], "OFF");
        assert_eq!(object["led"], "red");
    }
}
