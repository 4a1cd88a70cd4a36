use axum::{routing::get, Router};

use crate::{
    handlers::dashboard::{get_dashboard, get_events, get_seasons},
    utils::state::AppState,
};

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/seasons", get(get_seasons))
        .route("/events/{season}", get(get_events))
        .route("/dashboard", get(get_dashboard))
}
