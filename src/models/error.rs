use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("No data available: {0}")]
    DataUnavailable(String),
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),
    #[error("Malformed data: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Request limiter closed")]
    LimiterClosed,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidSelection(_) => StatusCode::BAD_REQUEST,
            Error::DataUnavailable(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Cache(_) | Error::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::LimiterClosed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({"error": self.to_string()}))).into_response()
    }
}
