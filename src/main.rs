use std::error::Error;

use clap::Parser;
use f1_insightx::{
    routes::{init_tracing, make_app},
    utils::config::Config,
};
use tokio::net::TcpListener;
use tracing::info;

/// F1 InsightX: lap times, tyre strategy and telemetry for any session since 2018.
#[derive(Debug, Parser)]
#[command(name = "f1-insightx", version)]
struct Cli {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::init();
    init_tracing(&config.log_level);

    let app = make_app(config)?;

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
