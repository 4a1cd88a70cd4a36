use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{error::Error, telemetry::LapWindow};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    FP1,
    FP2,
    FP3,
    Qualifying,
    Sprint,
    Race,
}

impl SessionType {
    pub const ALL: [SessionType; 6] = [
        SessionType::FP1,
        SessionType::FP2,
        SessionType::FP3,
        SessionType::Qualifying,
        SessionType::Sprint,
        SessionType::Race,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::FP1 => "FP1",
            SessionType::FP2 => "FP2",
            SessionType::FP3 => "FP3",
            SessionType::Qualifying => "Qualifying",
            SessionType::Sprint => "Sprint",
            SessionType::Race => "Race",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fp1" | "practice 1" => Ok(SessionType::FP1),
            "fp2" | "practice 2" => Ok(SessionType::FP2),
            "fp3" | "practice 3" => Ok(SessionType::FP3),
            "q" | "qualifying" => Ok(SessionType::Qualifying),
            "s" | "sprint" => Ok(SessionType::Sprint),
            "r" | "race" => Ok(SessionType::Race),
            "" => Err(Error::InvalidSelection("session type is required".into())),
            other => Err(Error::InvalidSelection(format!(
                "unknown session type '{other}'"
            ))),
        }
    }
}

/// One user selection. Rebuilt from the query string on every interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSelector {
    pub season: i32,
    pub event: String,
    pub session_type: SessionType,
}

impl SessionSelector {
    /// Parses raw widget values. Only checks that the input is well formed;
    /// whether the season is supported is decided by the dashboard.
    pub fn parse(season: &str, event: &str, session_type: &str) -> Result<Self, Error> {
        let season = season
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::InvalidSelection(format!("season '{season}' is not a year")))?;

        let event = event.trim();
        if event.is_empty() {
            return Err(Error::InvalidSelection("event is required".into()));
        }

        Ok(SessionSelector {
            season,
            event: event.to_string(),
            session_type: session_type.parse()?,
        })
    }
}

impl fmt::Display for SessionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.season, self.event, self.session_type)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    Unknown,
}

impl Compound {
    pub fn from_provider(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "SOFT" | "HYPERSOFT" | "ULTRASOFT" | "SUPERSOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" | "SUPERHARD" => Compound::Hard,
            "INTERMEDIATE" => Compound::Intermediate,
            "WET" => Compound::Wet,
            _ => Compound::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        }
    }

    pub fn colour(&self) -> &'static str {
        match self {
            Compound::Soft => "#da291c",
            Compound::Medium => "#ffd12e",
            Compound::Hard => "#f0f0ec",
            Compound::Intermediate => "#43b02a",
            Compound::Wet => "#0067ad",
            Compound::Unknown => "#888888",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub driver_number: u32,
    pub acronym: String,
    pub full_name: Option<String>,
    pub team_name: Option<String>,
    pub team_colour: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub driver: String,
    pub driver_number: u32,
    pub lap_number: u32,
    pub lap_time: Option<Duration>,
    pub compound: Compound,
    pub stint_number: Option<u32>,
    pub is_valid: bool,
    pub is_pit_out_lap: bool,
    pub date_start: Option<DateTime<Utc>>,
}

impl LapRecord {
    pub fn lap_seconds(&self) -> Option<f64> {
        self.lap_time.map(|t| t.as_secs_f64())
    }

    /// Wall-clock span of the lap, when both its start and duration are known.
    pub fn window(&self) -> Option<LapWindow> {
        let start = self.date_start?;
        let length = TimeDelta::from_std(self.lap_time?).ok()?;
        Some(LapWindow {
            start,
            end: start + length,
        })
    }
}

/// Everything the dashboard needs about one loaded session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub selector: SessionSelector,
    pub session_key: u32,
    pub meeting_name: String,
    pub drivers: Vec<DriverInfo>,
    pub laps: Vec<LapRecord>,
}

impl SessionData {
    pub fn driver(&self, acronym: &str) -> Option<&DriverInfo> {
        self.drivers
            .iter()
            .find(|d| d.acronym.eq_ignore_ascii_case(acronym))
    }

    pub fn team_colour(&self, acronym: &str) -> Option<String> {
        self.driver(acronym)
            .and_then(|d| d.team_colour.as_deref())
            .map(|c| format!("#{}", c.trim_start_matches('#')))
    }

    pub fn valid_laps(&self) -> impl Iterator<Item = &LapRecord> {
        self.laps.iter().filter(|lap| lap.is_valid)
    }
}
