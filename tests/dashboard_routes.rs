use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tower::ServiceExt;

use f1_insightx::{
    dashboard::SessionDashboard,
    models::{
        error::Error,
        race::EventSummary,
        session::{Compound, DriverInfo, LapRecord, SessionData, SessionSelector, SessionType},
        telemetry::{CarDataPoint, LapWindow, LocationPoint, RawTelemetry},
    },
    provider::SessionProvider,
    routes::router,
    utils::{config::Config, state::AppState},
};

const MONZA_LAPS: u32 = 51;

/// Recorded 2023 Italian Grand Prix, trimmed to three drivers.
struct MonzaProvider;

fn monza_event() -> EventSummary {
    EventSummary {
        round: 14,
        meeting_key: 1219,
        name: "Italian Grand Prix".into(),
        location: "Monza".into(),
        country: "Italy".into(),
        circuit: "Monza".into(),
        date_start: "2023-09-01T11:30:00Z".parse().ok(),
    }
}

fn monza_race(selector: &SessionSelector) -> SessionData {
    let start = "2023-09-03T13:03:00Z".parse::<DateTime<Utc>>().unwrap();
    let drivers = [(1, "VER", "3671C6"), (16, "LEC", "F91536"), (55, "SAI", "F91536")];

    let mut laps = Vec::new();
    for (n, (number, acronym, _)) in drivers.iter().enumerate() {
        for lap in 1..=MONZA_LAPS {
            // Standing start: lap 1 is the slowest.
            let millis = if lap == 1 { 91_000 } else { 85_000 + lap as u64 * 7 };
            laps.push(LapRecord {
                driver: acronym.to_string(),
                driver_number: *number,
                lap_number: lap,
                lap_time: Some(Duration::from_millis(millis + n as u64 * 250)),
                compound: if lap <= 19 { Compound::Medium } else { Compound::Hard },
                stint_number: Some(if lap <= 19 { 1 } else { 2 }),
                is_valid: true,
                is_pit_out_lap: lap == 20,
                date_start: Some(start + TimeDelta::seconds(lap as i64 * 86)),
            });
        }
    }

    SessionData {
        selector: selector.clone(),
        session_key: 9161,
        meeting_name: "Italian Grand Prix".into(),
        drivers: drivers
            .iter()
            .map(|(number, acronym, colour)| DriverInfo {
                driver_number: *number,
                acronym: acronym.to_string(),
                full_name: None,
                team_name: None,
                team_colour: Some(colour.to_string()),
            })
            .collect(),
        laps,
    }
}

#[async_trait]
impl SessionProvider for MonzaProvider {
    async fn fetch_events(&self, season: i32) -> Result<Vec<EventSummary>, Error> {
        if season == 2023 {
            Ok(vec![monza_event()])
        } else {
            Err(Error::DataUnavailable(format!("no events published for {season}")))
        }
    }

    async fn fetch_session(&self, selector: &SessionSelector) -> Result<SessionData, Error> {
        let is_monza = ["monza", "italian grand prix", "14"]
            .contains(&selector.event.to_lowercase().as_str());
        if selector.season == 2023 && is_monza && selector.session_type == SessionType::Race {
            Ok(monza_race(selector))
        } else {
            Err(Error::DataUnavailable(format!("no session for {selector}")))
        }
    }

    async fn fetch_lap_telemetry(
        &self,
        _session_key: u32,
        driver_number: u32,
        window: &LapWindow,
    ) -> Result<RawTelemetry, Error> {
        let car = (0..40)
            .map(|i| CarDataPoint {
                date: window.start + TimeDelta::milliseconds(i * 2000),
                driver_number,
                speed: 200.0 + (i % 5) as f64 * 30.0,
                throttle: None,
                brake: None,
                n_gear: None,
                rpm: None,
                drs: None,
            })
            .collect();
        let positions = (0..40)
            .map(|i| LocationPoint {
                date: window.start + TimeDelta::milliseconds(i * 2000 + 100),
                x: (i as f64).cos() * 1000.0,
                y: (i as f64).sin() * 1000.0,
            })
            .collect();
        Ok(RawTelemetry { car, positions })
    }
}

fn app() -> Router {
    router(AppState {
        config: Config::init(),
        dashboard: Arc::new(SessionDashboard::new(Arc::new(MonzaProvider))),
    })
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn numbers(values: &Value) -> Vec<f64> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_endpoint() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ok");
    assert_eq!(
        body["cache_dir"].as_str().unwrap(),
        Config::init().cache_dir.display().to_string()
    );
}

#[tokio::test]
async fn index_serves_dashboard_page() {
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Session Selection"));
    assert!(html.contains("/api/dashboard"));
}

#[tokio::test]
async fn seasons_start_in_2018() {
    let (status, body) = get("/api/seasons").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seasons"][0], 2018);
    assert_eq!(body["session_types"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn events_for_season() {
    let (status, body) = get("/api/events/2023").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"][0]["location"], "Monza");

    let (status, body) = get("/api/events/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not a year"));
}

#[tokio::test]
async fn monza_race_lap_times_cover_every_lap() {
    let (status, body) = get("/api/dashboard?season=2023&event=Monza&session=Race").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "F1 InsightX — 2023 Monza Race");

    let lap_times = &body["lap_times"];
    assert_eq!(lap_times["kind"], "chart");
    let series = lap_times["series"].as_array().unwrap();
    assert_eq!(series.len(), 3);
    for s in series {
        let laps = numbers(&s["x"]);
        let expected: Vec<f64> = (1..=MONZA_LAPS).map(f64::from).collect();
        assert_eq!(laps, expected);
    }
}

#[tokio::test]
async fn monza_race_strategy_and_telemetry() {
    let (status, body) = get("/api/dashboard?season=2023&event=Monza&session=Race").await;
    assert_eq!(status, StatusCode::OK);

    let strategy = &body["tyre_strategy"];
    assert_eq!(strategy["chart_type"], "stacked_bar");
    let names: Vec<&str> = strategy["series"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["MEDIUM", "HARD"]);

    assert_eq!(body["tyre_usage"]["chart_type"], "pie");

    assert_eq!(body["fastest_lap"]["driver"], "VER");
    assert_eq!(body["fastest_lap"]["lap_number"], 2);

    let speed = &body["speed_trace"];
    assert_eq!(speed["kind"], "chart");
    let distance = numbers(&speed["series"][0]["x"]);
    assert!(!distance.is_empty());
    assert!(distance.windows(2).all(|w| w[0] <= w[1]));

    assert_eq!(body["track_map"]["kind"], "chart");
}

#[tokio::test]
async fn driver_filter_picks_that_drivers_fastest_lap() {
    let (status, body) =
        get("/api/dashboard?season=2023&event=Italian%20Grand%20Prix&session=Race&driver=LEC").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fastest_lap"]["driver"], "LEC");
}

#[tokio::test]
async fn future_season_is_unavailable() {
    let (status, body) = get("/api/dashboard?season=2030&event=Monza&session=Race").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("2030"));
    assert!(body.get("lap_times").is_none());
}

#[tokio::test]
async fn malformed_selection_is_rejected() {
    let (status, _) = get("/api/dashboard?season=2023&event=&session=Race").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get("/api/dashboard?season=2023&event=Monza&session=FP9").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get("/api/dashboard").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_session_is_unavailable() {
    let (status, body) = get("/api/dashboard?season=2023&event=Monza&session=Sprint").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().starts_with("No data available"));
}
