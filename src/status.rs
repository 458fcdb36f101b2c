use crate::sensors::SensorSnapshot;
use core::fmt;
use serde::{Deserialize, Serialize};

const LED_RED_TEMP_C: f64 = 60.0;
const LED_RED_HUMIDITY_PERCENT: f64 = 80.0;
const LED_ORANGE_TEMP_MIN_C: f64 = 40.0;
const LED_ORANGE_HUMIDITY_MIN_PERCENT: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::On => "ON",
            EngineState::Off => "OFF",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard alert color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Red,
    Orange,
    Blue,
}

impl LedColor {
    pub fn as_str(self) -> &'static str {
        match self {
            LedColor::Red => "red",
            LedColor::Orange => "orange",
            LedColor::Blue => "blue",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine runs whenever the vehicle moves.
pub fn engine_state(speed: f64) -> EngineState {
    if speed > 0.0 {
        EngineState::On
    } else {
        EngineState::Off
    }
}

/// Classifies a reading into an alert color, first matching band wins.
///
/// - `red`: temperature above 60 or humidity above 80
/// - `orange`: temperature in [40, 60] or humidity in [60, 80]
/// - `blue`: anything else
///
/// Each field is checked on its own, so a hot but dry reading is still red.
pub fn led_color(temperature: f64, humidity: f64) -> LedColor {
    if temperature > LED_RED_TEMP_C || humidity > LED_RED_HUMIDITY_PERCENT {
        LedColor::Red
    } else if (LED_ORANGE_TEMP_MIN_C..=LED_RED_TEMP_C).contains(&temperature)
        || (LED_ORANGE_HUMIDITY_MIN_PERCENT..=LED_RED_HUMIDITY_PERCENT).contains(&humidity)
    {
        LedColor::Orange
    } else {
        LedColor::Blue
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStatus {
    pub engine_state: EngineState,
    pub led: LedColor,
}

impl DerivedStatus {
    pub fn from_snapshot(snapshot: &SensorSnapshot) -> Self {
        Self {
            engine_state: engine_state(snapshot.speed),
            led: led_color(snapshot.temperature, snapshot.humidity),
        }
    }
}
