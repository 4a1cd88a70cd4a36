pub mod cache;
pub mod chart;
pub mod error;
pub mod race;
pub mod session;
pub mod telemetry;
