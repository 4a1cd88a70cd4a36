pub mod dashboard;

use axum::{routing::get, Router};
use std::{error::Error, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::{
    dashboard::SessionDashboard,
    handlers::dashboard::{health_check, index},
    provider::{JolpicaProvider, OpenF1Provider, SeasonRouter, SessionProvider},
    routes::dashboard::dashboard_routes,
    utils::{
        config::Config, file_cache::FileCache, race_utils::FIRST_OPENF1_SEASON,
        rate_limiter::RateLimiter, state::AppState,
    },
};

pub fn init_tracing(log_level: &str) {
    let level = match log_level {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::TRACE)
        .with_target("tower_http::trace::on_request", Level::TRACE)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_target("axum::rejection", Level::TRACE)
        .with_target("f1_insightx", level)
        .with_default(Level::INFO);

    let tracing_layer = tracing_subscriber::fmt::layer();

    Registry::default().with(tracing_layer).with(filter).init();
}

/// Wires the OpenF1 and Jolpica providers, their disk cache and the dashboard
/// controller.
pub fn make_app(config: Config) -> Result<Router, Box<dyn Error>> {
    info!("Initializing application...");

    let cache = FileCache::new(&config.cache_dir, config.cache_ttl_seconds)?;
    info!(cache_dir = %cache.dir().display(), "Session cache ready");

    let http_client = reqwest::Client::builder()
        .user_agent(concat!("f1-insightx/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // Each API throttles separately.
    let jolpica = Arc::new(JolpicaProvider::new(
        http_client.clone(),
        &config.jolpica_base_url,
        cache.clone(),
        RateLimiter::new(config.max_concurrent_requests, config.min_request_delay_ms),
    ));
    let openf1 = OpenF1Provider::new(
        http_client,
        &config.openf1_base_url,
        cache,
        RateLimiter::new(config.max_concurrent_requests, config.min_request_delay_ms),
    )
    .with_opening_laps(jolpica.clone());

    let provider: Arc<dyn SessionProvider> =
        Arc::new(SeasonRouter::new(Arc::new(openf1), jolpica, FIRST_OPENF1_SEASON));
    info!(
        openf1 = %config.openf1_base_url,
        jolpica = %config.jolpica_base_url,
        "External clients initialized successfully"
    );

    let state = AppState {
        config,
        dashboard: Arc::new(SessionDashboard::new(provider)),
    };

    let app = router(state);
    info!("Application initialized successfully");
    Ok(app)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .nest("/api", dashboard_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
