pub mod dashboard;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod routes;
pub mod utils;
