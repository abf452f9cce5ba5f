//! HTTP request handlers for API endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::config::PipelineConfig;
use crate::cost::{CostReport, CostTotals, SortKey};
use crate::pipeline::run_pipeline;

/// Health check endpoint
///
/// Returns a simple status response to verify the server is running
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

/// Query parameters for the cost table endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CostQueryParams {
    /// "simple" or "mapped"; the server default when absent
    pub mode: Option<String>,
    /// "channel", "cac" or "total"; channel order when absent
    pub sort: Option<String>,
}

/// Response for the cost table endpoint
#[derive(Debug, Serialize)]
pub struct CostResponse {
    #[serde(flatten)]
    pub report: CostReport,
    pub totals: CostTotals,
}

fn resolve_config(
    state: &AppState,
    mode: Option<&str>,
) -> Result<Arc<PipelineConfig>, ApiError> {
    state
        .config_for(mode)
        .ok_or_else(|| ApiError::InvalidParameter(format!("Unknown mode: {}", mode.unwrap_or(""))))
}

/// GET /acquisition-cost - Run the cost pipeline against the database
pub async fn get_acquisition_cost(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CostQueryParams>,
) -> Result<Json<CostResponse>, ApiError> {
    let sort = match params.sort.as_deref() {
        Some(value) => value.parse::<SortKey>().map_err(ApiError::InvalidParameter)?,
        None => SortKey::Channel,
    };
    let config = resolve_config(&state, params.mode.as_deref())?;

    let mut report = {
        let source = state.record_source.lock().await;
        run_pipeline(&*source, &config)?
    };
    report.sort_by(sort);

    tracing::debug!(
        mode = %report.attribution_mode,
        rows = report.rows.len(),
        "served acquisition cost report"
    );

    let totals = report.totals();
    Ok(Json(CostResponse { report, totals }))
}

/// Query parameters for the config endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ConfigQueryParams {
    pub mode: Option<String>,
}

/// GET /config - Show the pipeline configuration for a mode
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConfigQueryParams>,
) -> Result<Json<PipelineConfig>, ApiError> {
    let config = resolve_config(&state, params.mode.as_deref())?;
    Ok(Json((*config).clone()))
}
