use std::sync::Arc;

use visage_engine::Engine;
use visage_native::BringUpReport;
use visage_readiness::Readiness;

use crate::config::Config;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<Engine>,
    pub readiness: Arc<Readiness>,
    pub bring_up: Arc<BringUpReport>,
}

impl AppState {
    pub fn new(
        config: Config,
        engine: Arc<Engine>,
        readiness: Readiness,
        bring_up: BringUpReport,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine,
            readiness: Arc::new(readiness),
            bring_up: Arc::new(bring_up),
        }
    }
}
