use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use http::StatusCode;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, warn};

use crate::{
    models::{
        error::Error,
        race::EventSummary,
        session::{Compound, DriverInfo, LapRecord, SessionData, SessionSelector, SessionType},
        telemetry::{CarDataPoint, LapWindow, LocationPoint, RawTelemetry},
    },
    provider::{JolpicaProvider, SessionProvider},
    utils::{
        file_cache::FileCache,
        race_utils::{match_event, provider_session_name},
        rate_limiter::RateLimiter,
    },
};

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingRow {
    pub meeting_key: u32,
    pub meeting_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub circuit_short_name: Option<String>,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRow {
    pub session_key: u32,
    pub session_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverRow {
    pub driver_number: u32,
    #[serde(default)]
    pub name_acronym: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_colour: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LapRow {
    pub driver_number: u32,
    pub lap_number: u32,
    #[serde(default)]
    pub lap_duration: Option<f64>,
    #[serde(default)]
    pub is_pit_out_lap: Option<bool>,
    #[serde(default)]
    pub date_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StintRow {
    pub driver_number: u32,
    pub stint_number: u32,
    #[serde(default)]
    pub lap_start: Option<u32>,
    #[serde(default)]
    pub lap_end: Option<u32>,
    #[serde(default)]
    pub compound: Option<String>,
}

/// OpenF1 (`https://api.openf1.org/v1`) backed provider with a disk cache in
/// front of every call.
pub struct OpenF1Provider {
    http_client: Client,
    base_url: String,
    cache: FileCache,
    limiter: RateLimiter,
    opening_laps: Option<Arc<JolpicaProvider>>,
}

impl OpenF1Provider {
    pub fn new(http_client: Client, base_url: &str, cache: FileCache, limiter: RateLimiter) -> Self {
        OpenF1Provider {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            limiter,
            opening_laps: None,
        }
    }

    /// Fills the missing lap 1 durations of races from Jolpica.
    pub fn with_opening_laps(mut self, source: Arc<JolpicaProvider>) -> Self {
        self.opening_laps = Some(source);
        self
    }

    async fn get_rows<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<Vec<T>, Error> {
        let url = format!("{}/{}", self.base_url, path_and_query);
        let _guard = self.limiter.acquire().await?;

        debug!(%url, "OpenF1 request");
        let res = self.http_client.get(&url).send().await?;

        // OpenF1 answers an empty result set with 404.
        if res.status() == StatusCode::NOT_FOUND {
            debug!(%url, "OpenF1 returned no rows");
            return Ok(Vec::new());
        }

        let body = res.error_for_status()?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn load_session(
        &self,
        selector: &SessionSelector,
        event: &EventSummary,
    ) -> Result<SessionData, Error> {
        let session_name = provider_session_name(selector.session_type);
        let sessions: Vec<SessionRow> = self
            .get_rows(&format!(
                "sessions?meeting_key={}&session_name={}",
                event.meeting_key, session_name
            ))
            .await?;

        let Some(session) = sessions.into_iter().find(|s| s.session_name == session_name) else {
            return Err(Error::DataUnavailable(format!(
                "{} has no {} session",
                event.name, selector.session_type
            )));
        };

        let key = session.session_key;
        let drivers: Vec<DriverRow> = self.get_rows(&format!("drivers?session_key={key}")).await?;
        let mut laps: Vec<LapRow> = self.get_rows(&format!("laps?session_key={key}")).await?;
        let stints: Vec<StintRow> = self.get_rows(&format!("stints?session_key={key}")).await?;

        info!(
            session_key = key,
            drivers = drivers.len(),
            laps = laps.len(),
            stints = stints.len(),
            "Loaded session from OpenF1"
        );

        if selector.session_type == SessionType::Race {
            self.complete_opening_laps(selector.season, event.round, &mut laps)
                .await;
        }

        Ok(map_session(selector, &event.name, key, drivers, laps, stints))
    }

    async fn complete_opening_laps(&self, season: i32, round: u32, laps: &mut [LapRow]) {
        let Some(source) = &self.opening_laps else {
            return;
        };
        if !laps.iter().any(|l| l.lap_number == 1 && l.lap_duration.is_none()) {
            return;
        }

        match source.opening_lap_times(season, round).await {
            Ok(times) => {
                let filled = fill_opening_laps(laps, &times);
                debug!(season, round, filled, "Filled lap 1 times from Jolpica");
            }
            Err(e) => warn!(season, round, "Could not load lap 1 times: {e}"),
        }
    }
}

#[async_trait]
impl SessionProvider for OpenF1Provider {
    async fn fetch_events(&self, season: i32) -> Result<Vec<EventSummary>, Error> {
        let cache_key = FileCache::key(&["events", &season.to_string()]);
        if let Some(events) = self.cache.get::<Vec<EventSummary>>(&cache_key).await {
            return Ok(events);
        }

        let meetings: Vec<MeetingRow> = self.get_rows(&format!("meetings?year={season}")).await?;
        let events = schedule_from_meetings(meetings);

        if events.is_empty() {
            return Err(Error::DataUnavailable(format!(
                "no events published for {season}"
            )));
        }

        self.cache.store(&cache_key, &events).await;
        Ok(events)
    }

    async fn fetch_session(&self, selector: &SessionSelector) -> Result<SessionData, Error> {
        let cache_key = FileCache::key(&[
            "session",
            &selector.season.to_string(),
            &selector.event,
            selector.session_type.as_str(),
        ]);
        if let Some(mut session) = self.cache.get::<SessionData>(&cache_key).await {
            session.selector = selector.clone();
            return Ok(session);
        }

        let events = self.fetch_events(selector.season).await?;
        let event = match_event(&events, &selector.event).ok_or_else(|| {
            Error::DataUnavailable(format!(
                "no event matching '{}' in {}",
                selector.event, selector.season
            ))
        })?;

        let session = self.load_session(selector, event).await?;

        // Sessions still to be run come back empty; keep them out of the cache.
        if session.laps.is_empty() {
            warn!(%selector, "Session has no laps yet");
            return Err(Error::DataUnavailable(format!("no laps recorded for {selector}")));
        }

        self.cache.store(&cache_key, &session).await;
        Ok(session)
    }

    async fn fetch_lap_telemetry(
        &self,
        session_key: u32,
        driver_number: u32,
        window: &LapWindow,
    ) -> Result<RawTelemetry, Error> {
        let cache_key = FileCache::key(&[
            "telemetry",
            &session_key.to_string(),
            &driver_number.to_string(),
            &window.start.timestamp_millis().to_string(),
        ]);
        if let Some(telemetry) = self.cache.get::<RawTelemetry>(&cache_key).await {
            return Ok(telemetry);
        }

        let start = window.start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = window.end.to_rfc3339_opts(SecondsFormat::Millis, true);
        let filter = format!(
            "session_key={session_key}&driver_number={driver_number}&date>={start}&date<={end}"
        );

        let car: Vec<CarDataPoint> = self.get_rows(&format!("car_data?{filter}")).await?;
        let positions: Vec<LocationPoint> = self.get_rows(&format!("location?{filter}")).await?;

        let telemetry = RawTelemetry { car, positions };
        if !telemetry.car.is_empty() {
            self.cache.store(&cache_key, &telemetry).await;
        }
        Ok(telemetry)
    }
}

/// Race-weekend schedule in calendar order. Pre-season testing is not a round.
pub fn schedule_from_meetings(mut meetings: Vec<MeetingRow>) -> Vec<EventSummary> {
    meetings.retain(|m| !m.meeting_name.to_lowercase().contains("testing"));
    meetings.sort_by_key(|m| (m.date_start, m.meeting_key));

    meetings
        .into_iter()
        .enumerate()
        .map(|(i, m)| EventSummary {
            round: i as u32 + 1,
            meeting_key: m.meeting_key,
            name: m.meeting_name,
            location: m.location.unwrap_or_default(),
            country: m.country_name.unwrap_or_default(),
            circuit: m.circuit_short_name.unwrap_or_default(),
            date_start: m.date_start,
        })
        .collect()
}

/// Copies known lap 1 times (by car number) into laps that have none.
/// Returns how many laps were filled.
pub fn fill_opening_laps(laps: &mut [LapRow], times: &HashMap<u32, Duration>) -> usize {
    let mut filled = 0;
    for lap in laps
        .iter_mut()
        .filter(|l| l.lap_number == 1 && l.lap_duration.is_none())
    {
        if let Some(time) = times.get(&lap.driver_number) {
            lap.lap_duration = Some(time.as_secs_f64());
            filled += 1;
        }
    }
    filled
}

/// Maps OpenF1 rows into the dashboard's session model. Each lap takes its
/// compound from the stint covering it; laps are ordered by driver number
/// then lap number.
pub fn map_session(
    selector: &SessionSelector,
    meeting_name: &str,
    session_key: u32,
    drivers: Vec<DriverRow>,
    laps: Vec<LapRow>,
    stints: Vec<StintRow>,
) -> SessionData {
    let mut drivers: Vec<DriverInfo> = drivers
        .into_iter()
        .map(|d| DriverInfo {
            driver_number: d.driver_number,
            acronym: d
                .name_acronym
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| d.driver_number.to_string()),
            full_name: d.full_name,
            team_name: d.team_name,
            team_colour: d.team_colour,
        })
        .collect();
    drivers.sort_by_key(|d| d.driver_number);
    drivers.dedup_by_key(|d| d.driver_number);

    let acronyms: HashMap<u32, String> = drivers
        .iter()
        .map(|d| (d.driver_number, d.acronym.clone()))
        .collect();

    let mut stints_by_driver: HashMap<u32, Vec<StintRow>> = HashMap::new();
    for stint in stints {
        stints_by_driver
            .entry(stint.driver_number)
            .or_default()
            .push(stint);
    }

    let mut laps: Vec<LapRecord> = laps
        .into_iter()
        .map(|lap| {
            let stint = stints_by_driver.get(&lap.driver_number).and_then(|stints| {
                stints.iter().find(|s| {
                    s.lap_start.is_some_and(|start| start <= lap.lap_number)
                        && s.lap_end.map_or(true, |end| lap.lap_number <= end)
                })
            });
            let lap_time = lap
                .lap_duration
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64);

            LapRecord {
                driver: acronyms
                    .get(&lap.driver_number)
                    .cloned()
                    .unwrap_or_else(|| lap.driver_number.to_string()),
                driver_number: lap.driver_number,
                lap_number: lap.lap_number,
                is_valid: lap_time.is_some(),
                lap_time,
                compound: stint
                    .and_then(|s| s.compound.as_deref())
                    .map(Compound::from_provider)
                    .unwrap_or(Compound::Unknown),
                stint_number: stint.map(|s| s.stint_number),
                is_pit_out_lap: lap.is_pit_out_lap.unwrap_or(false),
                date_start: lap.date_start,
            }
        })
        .collect();
    laps.sort_by_key(|l| (l.driver_number, l.lap_number));

    SessionData {
        selector: selector.clone(),
        session_key,
        meeting_name: meeting_name.to_string(),
        drivers,
        laps,
    }
}
