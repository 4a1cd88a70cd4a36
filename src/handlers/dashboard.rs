use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse},
    Json,
};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{
    models::{
        chart::{EventsResponse, SeasonsResponse},
        error::Error,
        session::{SessionSelector, SessionType},
    },
    utils::state::AppState,
};

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    season: String,
    #[serde(default)]
    event: String,
    #[serde(default)]
    session: String,
    driver: Option<String>,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "message": "ok",
            "cache_dir": state.config.cache_dir.display().to_string(),
        })),
    )
}

pub async fn get_seasons(State(state): State<AppState>) -> impl IntoResponse {
    Json(SeasonsResponse {
        seasons: state.dashboard.list_seasons(),
        session_types: SessionType::ALL.iter().map(|t| t.as_str()).collect(),
    })
}

pub async fn get_events(
    State(state): State<AppState>,
    Path(season): Path<String>,
) -> Result<Json<EventsResponse>, Error> {
    let season = season
        .parse::<i32>()
        .map_err(|_| Error::InvalidSelection(format!("season '{season}' is not a year")))?;

    let events = state.dashboard.list_events(season).await.inspect_err(|e| {
        warn!(season, "Could not load event schedule: {e}");
    })?;

    Ok(Json(EventsResponse { season, events }))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<impl IntoResponse, Error> {
    let selector = SessionSelector::parse(&params.season, &params.event, &params.session)?;
    let driver = params.driver.as_deref().filter(|d| !d.trim().is_empty());

    let response = state
        .dashboard
        .dashboard(&selector, driver)
        .await
        .inspect_err(|e| warn!(%selector, "Could not load session: {e}"))?;

    Ok((StatusCode::OK, Json(response)))
}
