//! Acquisition Cost API Server Binary
//!
//! Run with: `cargo run --bin acquisition-cost-server`

use acquisition_cost::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing is initialized in run_server().
    // RUST_LOG controls the level, e.g. RUST_LOG=acquisition_cost=debug

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "acquisition.db".to_string());

    let mut config = ServerConfig::new(host, port, database_path);
    if let Ok(path) = std::env::var("PIPELINE_CONFIG") {
        config = config.with_pipeline_config(path);
    }

    println!("Starting Acquisition Cost API Server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Database: {}", config.database_path);
    if let Some(path) = &config.pipeline_config_path {
        println!("   Pipeline config: {}", path);
    }
    println!();
    println!("Available endpoints:");
    println!("  GET  /health                                  - Health check");
    println!("  GET  /acquisition-cost?mode=&sort=            - Cost report");
    println!("  GET  /config?mode=                            - Pipeline configuration");
    println!();

    run_server(config).await?;

    Ok(())
}
