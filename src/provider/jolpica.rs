use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use http::StatusCode;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    models::{
        error::Error,
        race::EventSummary,
        session::{Compound, DriverInfo, LapRecord, SessionData, SessionSelector, SessionType},
        telemetry::{LapWindow, RawTelemetry},
    },
    provider::SessionProvider,
    utils::{
        file_cache::FileCache,
        race_utils::{match_event, FIRST_OPENF1_SEASON},
        rate_limiter::RateLimiter,
    },
};

/// Jolpica caps pages at 100 rows.
const PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Debug, Deserialize)]
struct MrData {
    #[serde(default)]
    limit: String,
    #[serde(default)]
    total: String,
    #[serde(rename = "RaceTable", default)]
    race_table: RaceTable,
}

#[derive(Debug, Default, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<RaceRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RaceRow {
    pub round: String,
    #[serde(rename = "raceName", default)]
    pub race_name: String,
    #[serde(rename = "Circuit", default)]
    pub circuit: Option<CircuitRow>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(rename = "Results", default)]
    pub results: Vec<ResultRow>,
    #[serde(rename = "Laps", default)]
    pub laps: Vec<LapTimingRow>,
    #[serde(rename = "PitStops", default)]
    pub pit_stops: Vec<PitStopRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitRow {
    #[serde(rename = "circuitName", default)]
    pub circuit_name: String,
    #[serde(rename = "Location", default)]
    pub location: Option<CircuitLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CircuitLocation {
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultRow {
    pub number: String,
    #[serde(rename = "Driver")]
    pub driver: ResultDriver,
    #[serde(rename = "Constructor", default)]
    pub constructor: Option<ResultConstructor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDriver {
    pub driver_id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultConstructor {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LapTimingRow {
    pub number: String,
    #[serde(rename = "Timings", default)]
    pub timings: Vec<TimingRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRow {
    pub driver_id: String,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitStopRow {
    pub driver_id: String,
    pub lap: String,
}

/// Jolpica (Ergast-compatible, `https://api.jolpi.ca/ergast/f1`) provider.
/// It covers seasons OpenF1 does not: race lap times, results and pit stops,
/// but no tyre compounds and no telemetry.
pub struct JolpicaProvider {
    http_client: Client,
    base_url: String,
    cache: FileCache,
    limiter: RateLimiter,
}

impl JolpicaProvider {
    pub fn new(http_client: Client, base_url: &str, cache: FileCache, limiter: RateLimiter) -> Self {
        JolpicaProvider {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            limiter,
        }
    }

    /// Fetches every page of `path` and merges the pages race by race.
    async fn get_races(&self, path: &str) -> Result<Vec<RaceRow>, Error> {
        let mut races: Vec<RaceRow> = Vec::new();
        let mut offset = 0;

        loop {
            let url = format!(
                "{}/{}/?format=json&limit={PAGE_LIMIT}&offset={offset}",
                self.base_url,
                path.trim_matches('/')
            );
            let _guard = self.limiter.acquire().await?;

            debug!(%url, "Jolpica request");
            let res = self.http_client.get(&url).send().await?;
            if res.status() == StatusCode::NOT_FOUND {
                break;
            }

            let body = res.error_for_status()?.text().await?;
            let page = serde_json::from_str::<Envelope>(&body)?.mr_data;
            let total = page.total.parse::<usize>().unwrap_or(0);
            let limit = page.limit.parse::<usize>().unwrap_or(PAGE_LIMIT).max(1);

            for race in page.race_table.races {
                match races.iter().position(|r| r.round == race.round) {
                    Some(i) => {
                        let existing = &mut races[i];
                        existing.results.extend(race.results);
                        existing.laps.extend(race.laps);
                        existing.pit_stops.extend(race.pit_stops);
                    }
                    None => races.push(race),
                }
            }

            offset += limit;
            if offset >= total {
                break;
            }
        }

        Ok(races)
    }

    async fn race(&self, path: &str) -> Result<Option<RaceRow>, Error> {
        Ok(self.get_races(path).await?.into_iter().next())
    }

    /// Official lap 1 times of a race by car number. OpenF1 leaves lap 1 of a
    /// race without a duration because it starts from the grid.
    pub async fn opening_lap_times(
        &self,
        season: i32,
        round: u32,
    ) -> Result<HashMap<u32, Duration>, Error> {
        let results = self
            .race(&format!("{season}/{round}/results"))
            .await?
            .map(|r| r.results)
            .unwrap_or_default();
        let laps = self
            .race(&format!("{season}/{round}/laps/1"))
            .await?
            .map(|r| r.laps)
            .unwrap_or_default();

        Ok(lap_times_by_number(&results, &laps, 1))
    }
}

#[async_trait]
impl SessionProvider for JolpicaProvider {
    async fn fetch_events(&self, season: i32) -> Result<Vec<EventSummary>, Error> {
        let cache_key = FileCache::key(&["jolpica", "events", &season.to_string()]);
        if let Some(events) = self.cache.get::<Vec<EventSummary>>(&cache_key).await {
            return Ok(events);
        }

        let races = self.get_races(&format!("{season}/races")).await?;
        let events = schedule_from_races(season, races);
        if events.is_empty() {
            return Err(Error::DataUnavailable(format!(
                "no events published for {season}"
            )));
        }

        self.cache.store(&cache_key, &events).await;
        Ok(events)
    }

    async fn fetch_session(&self, selector: &SessionSelector) -> Result<SessionData, Error> {
        if selector.session_type != SessionType::Race {
            return Err(Error::DataUnavailable(format!(
                "lap times before {FIRST_OPENF1_SEASON} are only published for races, not {}",
                selector.session_type
            )));
        }

        let cache_key = FileCache::key(&[
            "jolpica",
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

        let path = format!("{}/{}", selector.season, event.round);
        let results = self.race(&format!("{path}/results")).await?.map(|r| r.results);
        let laps = self.race(&format!("{path}/laps")).await?.map(|r| r.laps);
        let pit_stops = self.race(&format!("{path}/pitstops")).await?.map(|r| r.pit_stops);

        let session = map_race(
            selector,
            &event.name,
            event.meeting_key,
            results.unwrap_or_default(),
            laps.unwrap_or_default(),
            pit_stops.unwrap_or_default(),
        );

        if session.laps.is_empty() {
            warn!(%selector, "Race has no lap times yet");
            return Err(Error::DataUnavailable(format!("no laps recorded for {selector}")));
        }

        info!(
            %selector,
            drivers = session.drivers.len(),
            laps = session.laps.len(),
            "Loaded race from Jolpica"
        );

        self.cache.store(&cache_key, &session).await;
        Ok(session)
    }

    async fn fetch_lap_telemetry(
        &self,
        session_key: u32,
        _driver_number: u32,
        _window: &LapWindow,
    ) -> Result<RawTelemetry, Error> {
        debug!(session_key, "No telemetry is published for this session");
        Ok(RawTelemetry::default())
    }
}

/// Session key for a Jolpica race, e.g. `202008` for round 8 of 2020. OpenF1
/// keys stay far below this range.
pub fn historic_key(season: i32, round: u32) -> u32 {
    season.max(0) as u32 * 100 + round
}

/// Parses a timing-screen lap time such as `1:21.046` or `58.3`.
pub fn parse_lap_time(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (minutes, seconds) = match text.split_once(':') {
        Some((m, s)) => (m.parse::<u64>().ok()?, s),
        None => (0, text),
    };
    let seconds = seconds.parse::<f64>().ok()?;
    let millis = (minutes as f64 * 60_000.0 + seconds * 1000.0).round();
    (millis.is_finite() && millis > 0.0).then(|| Duration::from_millis(millis as u64))
}

fn race_start(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date?, "%Y-%m-%d").ok()?;
    let time = time
        .and_then(|t| NaiveTime::parse_from_str(t.trim_end_matches('Z'), "%H:%M:%S").ok())
        .or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
    Some(date.and_time(time).and_utc())
}

/// Season schedule in round order.
pub fn schedule_from_races(season: i32, races: Vec<RaceRow>) -> Vec<EventSummary> {
    let mut events: Vec<EventSummary> = races
        .into_iter()
        .filter_map(|race| {
            let round = race.round.parse::<u32>().ok()?;
            let date_start = race_start(race.date.as_deref(), race.time.as_deref());
            let (circuit, location) = match race.circuit {
                Some(c) => (c.circuit_name, c.location.unwrap_or_default()),
                None => (String::new(), CircuitLocation::default()),
            };
            Some(EventSummary {
                round,
                meeting_key: historic_key(season, round),
                name: race.race_name,
                location: location.locality,
                country: location.country,
                circuit,
                date_start,
            })
        })
        .collect();
    events.sort_by_key(|e| e.round);
    events
}

/// Lap times of one lap keyed by car number. Drivers missing from the results
/// are skipped.
pub fn lap_times_by_number(
    results: &[ResultRow],
    laps: &[LapTimingRow],
    lap_number: u32,
) -> HashMap<u32, Duration> {
    let numbers: HashMap<&str, u32> = results
        .iter()
        .filter_map(|r| Some((r.driver.driver_id.as_str(), r.number.parse::<u32>().ok()?)))
        .collect();

    laps.iter()
        .filter(|lap| lap.number.parse::<u32>().ok() == Some(lap_number))
        .flat_map(|lap| &lap.timings)
        .filter_map(|t| Some((*numbers.get(t.driver_id.as_str())?, parse_lap_time(&t.time)?)))
        .collect()
}

/// Maps a Jolpica race into the dashboard's session model. Compounds are
/// unknown; stints are counted from the pit stops, a stop on lap N starting
/// a new stint on lap N + 1.
pub fn map_race(
    selector: &SessionSelector,
    meeting_name: &str,
    session_key: u32,
    results: Vec<ResultRow>,
    laps: Vec<LapTimingRow>,
    pit_stops: Vec<PitStopRow>,
) -> SessionData {
    let mut entrants: HashMap<String, (u32, String)> = HashMap::new();
    let mut drivers = Vec::new();
    for result in results {
        let Ok(number) = result.number.parse::<u32>() else {
            continue;
        };
        let acronym = result
            .driver
            .code
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| number.to_string());
        entrants.insert(result.driver.driver_id, (number, acronym.clone()));
        drivers.push(DriverInfo {
            driver_number: number,
            acronym,
            full_name: Some(format!("{} {}", result.driver.given_name, result.driver.family_name)),
            team_name: result.constructor.map(|c| c.name),
            team_colour: None,
        });
    }
    drivers.sort_by_key(|d| d.driver_number);
    drivers.dedup_by_key(|d| d.driver_number);

    let mut stops: HashMap<String, Vec<u32>> = HashMap::new();
    for stop in pit_stops {
        if let Ok(lap) = stop.lap.parse::<u32>() {
            stops.entry(stop.driver_id).or_default().push(lap);
        }
    }

    let mut records = Vec::new();
    for lap in laps {
        let Ok(lap_number) = lap.number.parse::<u32>() else {
            continue;
        };
        for timing in lap.timings {
            let Some((number, acronym)) = entrants.get(&timing.driver_id) else {
                continue;
            };
            let driver_stops = stops.get(&timing.driver_id);
            let stops_before = driver_stops.map_or(0, |s| s.iter().filter(|&&l| l < lap_number).count());
            let lap_time = parse_lap_time(&timing.time);

            records.push(LapRecord {
                driver: acronym.clone(),
                driver_number: *number,
                lap_number,
                is_valid: lap_time.is_some(),
                lap_time,
                compound: Compound::Unknown,
                stint_number: Some(stops_before as u32 + 1),
                is_pit_out_lap: driver_stops.is_some_and(|s| s.contains(&(lap_number.saturating_sub(1)))),
                date_start: None,
            });
        }
    }
    records.sort_by_key(|l| (l.driver_number, l.lap_number));
    records.dedup_by_key(|l| (l.driver_number, l.lap_number));

    SessionData {
        selector: selector.clone(),
        session_key,
        meeting_name: meeting_name.to_string(),
        drivers,
        laps: records,
    }
}
