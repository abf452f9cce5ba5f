//! One-shot acquisition cost report printed as JSON.
//!
//! Usage: `acquisition-cost-report <database.db | csv-dir> [pipeline.json] [channel|cac|total]`

use acquisition_cost::{
    run_pipeline, CsvRecordSource, PipelineConfig, RecordSource, SortKey, SqliteRecordSource,
};
use serde_json::json;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .ok_or("usage: acquisition-cost-report <database.db | csv-dir> [pipeline.json] [sort]")?;
    let config = match args.next() {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::reference_simple()?,
    };
    let sort = match args.next() {
        Some(key) => key.parse::<SortKey>()?,
        None => SortKey::Channel,
    };

    let source: Box<dyn RecordSource> = if Path::new(&input).is_dir() {
        Box::new(CsvRecordSource::new(&input))
    } else {
        Box::new(SqliteRecordSource::new(&input)?)
    };

    let mut report = run_pipeline(source.as_ref(), &config)?;
    report.sort_by(sort);
    let totals = report.totals();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "report": report, "totals": totals }))?
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
