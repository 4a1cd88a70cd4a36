use std::path::PathBuf;

pub const DEFAULT_OPENF1_BASE_URL: &str = "https://api.openf1.org/v1";
pub const DEFAULT_JOLPICA_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub cache_ttl_seconds: i64,
    pub openf1_base_url: String,
    pub jolpica_base_url: String,
    pub max_concurrent_requests: usize,
    pub min_request_delay_ms: u64,
    pub log_level: String,
}

impl Config {
    pub fn init() -> Self {
        Config {
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ff1cache")),
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", 7 * 24 * 60 * 60),
            openf1_base_url: std::env::var("OPENF1_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENF1_BASE_URL.to_string()),
            jolpica_base_url: std::env::var("JOLPICA_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_JOLPICA_BASE_URL.to_string()),
            max_concurrent_requests: env_or("OPENF1_MAX_CONCURRENT", 2),
            min_request_delay_ms: env_or("OPENF1_MIN_DELAY_MS", 350),
            log_level: std::env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string())
                .to_lowercase(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
