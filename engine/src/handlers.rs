//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - train: Fit a new model and write its artifact
//! - models: List artifacts on disk
//! - predict: Price one flat, optionally with an explanation
//! - top-regions: Rank regions by launch count
//! - ask: Answer a free-form question through the conductor
//! - metrics: Show request counters

use anyhow::{Context, Result};
use chrono::Utc;
use sdk::plan::StepOutcome;
use sdk::types::{PredictPriceRequest, TopRegions, TopRegionsRequest};
use serde::Serialize;
use serde_json::json;

use crate::config::Config;
use crate::db::Database;
use crate::model::{select_latest, train_and_persist, ArtifactStore, FsArtifactStore};
use crate::service::AdvisorService;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Train a new model from every stored resale transaction
pub async fn handle_train(config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&config.store.database_path)
        .await
        .context("Failed to open reference store")?;

    let report = train_and_persist(
        &database.transactions(),
        &config.model.artifact_dir,
        config.model.l2_penalty,
        Utc::now(),
    )
    .await?;
    database.close().await;

    match format {
        OutputFormat::Text => {
            println!("Model trained and saved as {}", report.path.display());
            println!("  Version:  {}", report.version);
            println!("  Rows:     {}", report.training_rows);
            if report.skipped_rows > 0 {
                println!("  Skipped:  {} (missing columns)", report.skipped_rows);
            }
            println!("  Features: {}", report.feature_count);
            println!("  RMSE:     {:.2}", report.rmse);
            println!("  R²:       {:.4}", report.r_squared);
        }
        OutputFormat::Json => print_json(&report)?,
    }

    Ok(())
}

/// List model artifacts, newest first, marking the one that would be served
pub async fn handle_models(config: &Config, format: OutputFormat) -> Result<()> {
    let store = FsArtifactStore::new(&config.model.artifact_dir);
    let mut versions = store.list_versions()?;
    let latest = select_latest(versions.clone());
    versions.sort_by(|a, b| b.cmp(a));

    match format {
        OutputFormat::Text => {
            if versions.is_empty() {
                println!("No model artifacts in {}", store.dir().display());
                println!("Run `resale train` to create one.");
                return Ok(());
            }

            println!("Model artifacts in {}:", store.dir().display());
            for version in &versions {
                let marker = if Some(version) == latest.as_ref() {
                    " (serving)"
                } else {
                    ""
                };
                println!("  {}{}", version, marker);
            }
        }
        OutputFormat::Json => {
            let names: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
            print_json(&json!({
                "directory": store.dir(),
                "versions": names,
                "latest": latest.as_ref().map(|v| v.as_str()),
            }))?;
        }
    }

    Ok(())
}

/// Predict the price of one flat
pub async fn handle_predict(
    request: PredictPriceRequest,
    explain: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let service = AdvisorService::from_config(config, explain).await?;

    let quote = if explain {
        service.predict_price_explained(request).await?
    } else {
        service.predict_price(request)?
    };

    match format {
        OutputFormat::Text => {
            println!("Predicted price: {:.2}", quote.predicted_price);
            if let Some(discounted) = quote.discounted_price {
                println!("Discounted price: {:.2}", discounted);
            }
            println!("Model: {}", quote.model_version);
            if let Some(explanation) = &quote.explanation {
                println!();
                println!("{}", explanation);
            }
        }
        OutputFormat::Json => print_json(&quote)?,
    }

    Ok(())
}

/// Rank regions by launch count
pub async fn handle_top_regions(
    request: TopRegionsRequest,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let service = AdvisorService::from_config(config, false).await?;
    let result = service.top_regions(request).await?;

    match format {
        OutputFormat::Text => match &result {
            TopRegions::NoData => println!("No launch data in the requested window."),
            TopRegions::Regions(regions) => {
                for (rank, region) in regions.iter().enumerate() {
                    println!("{:>2}. {:<20} {} launches", rank + 1, region.region, region.count);
                }
            }
        },
        OutputFormat::Json => print_json(&result)?,
    }

    Ok(())
}

/// Answer a free-form question
pub async fn handle_ask(question: String, config: &Config, format: OutputFormat) -> Result<()> {
    let service = AdvisorService::from_config(config, true).await?;
    let report = service.run_agent_query(&question).await?;

    match format {
        OutputFormat::Text => {
            println!("{}", report.summary);
            println!();
            println!("Plan ({} steps):", report.plan.len());
            for (i, record) in report.results.iter().enumerate() {
                let status = match &record.outcome {
                    StepOutcome::Success { .. } => "ok".to_string(),
                    StepOutcome::Failure { error } => format!("failed: {}", error),
                };
                println!(
                    "  {}. {} {} -> {}",
                    i + 1,
                    record.action.verb,
                    record.action.target,
                    status
                );
            }
        }
        OutputFormat::Json => print_json(&report)?,
    }

    Ok(())
}

/// Show counters and the serving model version
pub async fn handle_metrics(config: &Config, format: OutputFormat) -> Result<()> {
    let service = AdvisorService::from_config(config, false).await?;
    let snapshot = service.metrics();

    match format {
        OutputFormat::Text => {
            println!("Requests: {}", snapshot.request_count);
            println!("Errors:   {}", snapshot.error_count);
            println!("Model:    {}", snapshot.model_version);
        }
        OutputFormat::Json => print_json(&snapshot)?,
    }

    Ok(())
}
