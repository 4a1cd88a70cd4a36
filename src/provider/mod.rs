pub mod jolpica;
pub mod openf1;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;

use crate::models::{
    error::Error,
    race::EventSummary,
    session::{SessionData, SessionSelector},
    telemetry::{LapWindow, RawTelemetry},
};

pub use jolpica::JolpicaProvider;
pub use openf1::OpenF1Provider;

/// Source of session data. Implementations own their caching.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn fetch_events(&self, season: i32) -> Result<Vec<EventSummary>, Error>;

    /// Fails with `Error::DataUnavailable` when the provider has nothing for
    /// the selection.
    async fn fetch_session(&self, selector: &SessionSelector) -> Result<SessionData, Error>;

    async fn fetch_lap_telemetry(
        &self,
        session_key: u32,
        driver_number: u32,
        window: &LapWindow,
    ) -> Result<RawTelemetry, Error>;
}

/// Sends seasons from `first_current_season` on to `current` and older ones
/// to `historic`. Telemetry follows the year of the lap.
pub struct SeasonRouter {
    current: Arc<dyn SessionProvider>,
    historic: Arc<dyn SessionProvider>,
    first_current_season: i32,
}

impl SeasonRouter {
    pub fn new(
        current: Arc<dyn SessionProvider>,
        historic: Arc<dyn SessionProvider>,
        first_current_season: i32,
    ) -> Self {
        SeasonRouter {
            current,
            historic,
            first_current_season,
        }
    }

    fn provider_for(&self, season: i32) -> &dyn SessionProvider {
        if season >= self.first_current_season {
            self.current.as_ref()
        } else {
            self.historic.as_ref()
        }
    }
}

#[async_trait]
impl SessionProvider for SeasonRouter {
    async fn fetch_events(&self, season: i32) -> Result<Vec<EventSummary>, Error> {
        self.provider_for(season).fetch_events(season).await
    }

    async fn fetch_session(&self, selector: &SessionSelector) -> Result<SessionData, Error> {
        self.provider_for(selector.season).fetch_session(selector).await
    }

    async fn fetch_lap_telemetry(
        &self,
        session_key: u32,
        driver_number: u32,
        window: &LapWindow,
    ) -> Result<RawTelemetry, Error> {
        self.provider_for(window.start.year())
            .fetch_lap_telemetry(session_key, driver_number, window)
            .await
    }
}
