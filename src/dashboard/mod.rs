pub mod render;
pub mod views;

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    models::{
        chart::{ChartPanel, DashboardResponse, FastestLapSummary},
        error::Error,
        race::EventSummary,
        session::{SessionData, SessionSelector},
    },
    provider::SessionProvider,
    utils::race_utils::{current_season, format_lap_time, is_supported_season, supported_seasons},
};

use render::{render, LapTimeDistribution, TrackMap};
use views::{
    build_telemetry_trace, derive_lap_time_view, derive_tyre_strategy_view,
    derive_tyre_usage_view, fastest_lap, TelemetryView,
};

/// Session Dashboard Controller: load a session, derive the views, render them.
pub struct SessionDashboard {
    provider: Arc<dyn SessionProvider>,
}

impl SessionDashboard {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        SessionDashboard { provider }
    }

    pub fn list_seasons(&self) -> Vec<i32> {
        supported_seasons(current_season())
    }

    pub async fn list_events(&self, season: i32) -> Result<Vec<EventSummary>, Error> {
        check_season(season, current_season())?;
        self.provider.fetch_events(season).await
    }

    pub async fn select_session(&self, selector: &SessionSelector) -> Result<SessionData, Error> {
        check_season(selector.season, current_season())?;

        let session = self.provider.fetch_session(selector).await?;
        if session.laps.is_empty() {
            return Err(Error::DataUnavailable(format!("no laps recorded for {selector}")));
        }

        info!(%selector, session_key = session.session_key, laps = session.laps.len(), "Session selected");
        Ok(session)
    }

    /// Telemetry of the fastest valid lap (of `driver`, when given). An empty
    /// view means there is no fastest lap to show.
    pub async fn derive_fastest_lap_telemetry(
        &self,
        session: &SessionData,
        driver: Option<&str>,
    ) -> Result<TelemetryView, Error> {
        let Some(lap) = fastest_lap(session, driver) else {
            return Ok(TelemetryView {
                label: "no fastest lap".into(),
                samples: Vec::new(),
            });
        };
        let label = format!("{} lap {}", lap.driver, lap.lap_number);

        let Some(window) = lap.window() else {
            warn!(%label, "Fastest lap has no start time; telemetry cannot be located");
            return Ok(TelemetryView {
                label,
                samples: Vec::new(),
            });
        };

        let raw = self
            .provider
            .fetch_lap_telemetry(session.session_key, lap.driver_number, &window)
            .await?;

        let mut samples = build_telemetry_trace(raw);
        samples.retain(|s| window.contains(&s.timestamp));

        Ok(TelemetryView { label, samples })
    }

    /// One full load-then-render cycle for a selection.
    pub async fn dashboard(
        &self,
        selector: &SessionSelector,
        driver: Option<&str>,
    ) -> Result<DashboardResponse, Error> {
        let session = self.select_session(selector).await?;

        let lap_times = derive_lap_time_view(&session);
        let tyre_strategy = derive_tyre_strategy_view(&session);
        let tyre_usage = derive_tyre_usage_view(&session);

        let (speed_trace, track_map) =
            match self.derive_fastest_lap_telemetry(&session, driver).await {
                Ok(telemetry) => (render(&telemetry), render(&TrackMap(&telemetry))),
                Err(e) => {
                    warn!(%selector, "Could not load telemetry: {e}");
                    let message = format!("Could not load telemetry: {e}");
                    (
                        ChartPanel::placeholder(message.clone()),
                        ChartPanel::placeholder(message),
                    )
                }
            };

        let fastest = fastest_lap(&session, driver).map(|lap| FastestLapSummary {
            driver: lap.driver.clone(),
            lap_number: lap.lap_number,
            lap_time: lap.lap_seconds().map(format_lap_time).unwrap_or_default(),
        });

        Ok(DashboardResponse {
            title: format!(
                "F1 InsightX — {} {} {}",
                selector.season, selector.event, selector.session_type
            ),
            session_key: session.session_key,
            meeting_name: session.meeting_name.clone(),
            drivers: session.drivers.iter().map(|d| d.acronym.clone()).collect(),
            fastest_lap: fastest,
            lap_times: render(&lap_times),
            lap_time_distribution: render(&LapTimeDistribution(&lap_times)),
            tyre_strategy: render(&tyre_strategy),
            tyre_usage: render(&tyre_usage),
            speed_trace,
            track_map,
        })
    }
}

fn check_season(season: i32, current: i32) -> Result<(), Error> {
    if is_supported_season(season, current) {
        Ok(())
    } else {
        Err(Error::DataUnavailable(format!(
            "season {season} is not supported (2018 to {current})"
        )))
    }
}
