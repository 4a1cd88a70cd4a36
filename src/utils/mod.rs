pub mod config;
pub mod file_cache;
pub mod race_utils;
pub mod rate_limiter;
pub mod state;
