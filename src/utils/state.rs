use std::sync::Arc;

use crate::{dashboard::SessionDashboard, utils::config::Config};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dashboard: Arc<SessionDashboard>,
}
