// Resale Advisor
// Main entry point for the resale binary

use clap::Parser;
use resale_engine::cli::{Cli, Command};
use resale_engine::config::Config;
use resale_engine::handlers::{
    handle_ask, handle_metrics, handle_models, handle_predict, handle_top_regions, handle_train,
    OutputFormat,
};
use resale_engine::telemetry::init_telemetry_with_level;
use sdk::types::{PredictPriceRequest, TopRegionsRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Resale Advisor v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Train => {
            tracing::info!("Training price model...");
            handle_train(&config, format).await
        }

        Command::Models => handle_models(&config, format).await,

        Command::Predict {
            region,
            unit_type,
            storey_range,
            floor_area_sqm,
            unit_model,
            remaining_lease_years,
            discount,
            explain,
        } => {
            let request = PredictPriceRequest {
                region: Some(region),
                unit_type: Some(unit_type),
                storey_range: Some(storey_range),
                floor_area_sqm: Some(floor_area_sqm),
                unit_model: Some(unit_model),
                remaining_lease_years: Some(remaining_lease_years),
                discount,
            };
            handle_predict(request, explain, &config, format).await
        }

        Command::TopRegions {
            direction,
            window_years,
            limit,
        } => {
            let request = TopRegionsRequest {
                direction,
                window_years,
                limit,
            };
            handle_top_regions(request, &config, format).await
        }

        Command::Ask { question } => handle_ask(question, &config, format).await,

        Command::Metrics => handle_metrics(&config, format).await,
    }
}
