use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LapWindow {
    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        *date >= self.start && *date <= self.end
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarDataPoint {
    pub date: DateTime<Utc>,
    pub driver_number: u32,
    pub speed: f64,
    pub throttle: Option<f64>,
    pub brake: Option<f64>,
    pub n_gear: Option<u32>,
    pub rpm: Option<u32>,
    pub drs: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationPoint {
    pub date: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
}

/// Car and position channels for one lap, as delivered by the provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawTelemetry {
    pub car: Vec<CarDataPoint>,
    pub positions: Vec<LocationPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TelemetrySample {
    /// Metres from the start of the lap.
    pub distance: f64,
    /// km/h
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}
