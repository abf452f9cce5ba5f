//! Shared application state for the API server

use crate::config::PipelineConfig;
use crate::mapping::AttributionMode;
use crate::sqlite_source::SqliteRecordSource;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SQLite record source
    /// Wrapped in Mutex because SQLite connections are not thread-safe
    pub record_source: Arc<Mutex<SqliteRecordSource>>,
    /// Configuration used when a request asks for simple attribution
    pub simple: Arc<PipelineConfig>,
    /// Configuration used when a request asks for mapped attribution
    pub mapped: Arc<PipelineConfig>,
    /// Mode used when a request names none
    pub default_mode: &'static str,
}

impl AppState {
    /// Creates application state from a record source and the two mode
    /// configurations. The first configuration decides the default mode.
    pub fn new(
        record_source: SqliteRecordSource,
        primary: PipelineConfig,
        fallback: PipelineConfig,
    ) -> Self {
        let default_mode = primary.attribution.name();
        let (simple, mapped) = match primary.attribution {
            AttributionMode::Simple => (primary, fallback),
            AttributionMode::Mapped { .. } => (fallback, primary),
        };

        AppState {
            record_source: Arc::new(Mutex::new(record_source)),
            simple: Arc::new(simple),
            mapped: Arc::new(mapped),
            default_mode,
        }
    }

    /// Looks up the configuration for a mode name.
    pub fn config_for(&self, mode: Option<&str>) -> Option<Arc<PipelineConfig>> {
        match mode.unwrap_or(self.default_mode) {
            "simple" => Some(Arc::clone(&self.simple)),
            "mapped" => Some(Arc::clone(&self.mapped)),
            _ => None,
        }
    }
}
