//! REST API server exposing the acquisition cost report

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use handlers::{CostQueryParams, CostResponse};
pub use routes::create_router;
pub use state::AppState;

use crate::config::PipelineConfig;
use crate::mapping::AttributionMode;
use crate::sqlite_source::SqliteRecordSource;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Path to the SQLite database holding the source tables
    pub database_path: String,
    /// Optional JSON pipeline configuration; replaces the reference
    /// configuration of its own attribution mode and becomes the default mode
    pub pipeline_config_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: "acquisition.db".to_string(),
            pipeline_config_path: None,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration
    pub fn new(host: impl Into<String>, port: u16, database_path: impl Into<String>) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            database_path: database_path.into(),
            pipeline_config_path: None,
        }
    }

    pub fn with_pipeline_config(mut self, path: impl Into<String>) -> Self {
        self.pipeline_config_path = Some(path.into());
        self
    }
}

fn load_pipeline_configs(
    config: &ServerConfig,
) -> Result<(PipelineConfig, PipelineConfig), Box<dyn std::error::Error>> {
    let primary = match &config.pipeline_config_path {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::reference_simple()?,
    };
    let fallback = match primary.attribution {
        AttributionMode::Simple => PipelineConfig::reference_mapped()?,
        AttributionMode::Mapped { .. } => PipelineConfig::reference_simple()?,
    };
    Ok((primary, fallback))
}

/// Runs the API server
///
/// # Arguments
/// * `config` - Server configuration
///
/// # Returns
/// Returns an error if the server fails to start or encounters a fatal error
///
/// # Example
/// ```rust,no_run
/// use acquisition_cost::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     run_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let record_source = SqliteRecordSource::new(&config.database_path)?;
    let (primary, fallback) = load_pipeline_configs(&config)?;
    tracing::info!(
        default_mode = primary.attribution.name(),
        pool = primary.total_indirect_pool,
        "pipeline configuration loaded"
    );

    let state = Arc::new(AppState::new(record_source, primary, fallback));
    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
