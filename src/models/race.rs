use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a season's event schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub round: u32,
    pub meeting_key: u32,
    pub name: String,
    pub location: String,
    pub country: String,
    pub circuit: String,
    pub date_start: Option<DateTime<Utc>>,
}
