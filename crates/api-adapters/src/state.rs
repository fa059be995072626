use std::sync::Arc;

use services::PollService;

use crate::metrics::Metrics;

/// Shared by every handler; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PollService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(service: PollService) -> Self {
        Self {
            service: Arc::new(service),
            metrics: Arc::new(Metrics::new()),
        }
    }
}
