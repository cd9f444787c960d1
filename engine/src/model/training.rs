//! Offline training job
//!
//! Loads every resale transaction, fits the pipeline, and persists a new
//! artifact. Never runs on the request path.

use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::artifact::ModelArtifact;
use super::pipeline::PricePipeline;
use crate::db::{ResaleTransaction, TransactionRepository};

/// Outcome of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub version: String,
    pub path: PathBuf,
    pub training_rows: usize,
    /// Stored rows left out because a model column was NULL
    pub skipped_rows: usize,
    pub feature_count: usize,
    /// In-sample root mean squared error
    pub rmse: f64,
    /// In-sample coefficient of determination
    pub r_squared: f64,
}

/// In-sample fit statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStats {
    pub rmse: f64,
    pub r_squared: f64,
}

/// Fit a pipeline to `transactions`
pub fn fit_pipeline(
    transactions: &[ResaleTransaction],
    l2_penalty: f64,
) -> Result<(PricePipeline, FitStats), EngineError> {
    if transactions.is_empty() {
        return Err(EngineError::Training(
            "no resale transactions to train on".to_string(),
        ));
    }

    let descriptors: Vec<_> = transactions.iter().map(|t| t.descriptor.clone()).collect();
    let prices: Vec<f64> = transactions.iter().map(|t| t.price).collect();

    let pipeline = PricePipeline::fit(&descriptors, &prices, l2_penalty)?;
    let predictions: Vec<f64> = descriptors.iter().map(|d| pipeline.predict_raw(d)).collect();
    let stats = fit_stats(&predictions, &prices);

    Ok((pipeline, stats))
}

fn fit_stats(predictions: &[f64], targets: &[f64]) -> FitStats {
    let n = targets.len() as f64;
    let mean = targets.iter().sum::<f64>() / n;

    let ss_res: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| (y - p).powi(2))
        .sum();
    let ss_tot: f64 = targets.iter().map(|y| (y - mean).powi(2)).sum();

    FitStats {
        rmse: (ss_res / n).sqrt(),
        r_squared: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 },
    }
}

/// Train on every stored transaction and write a new artifact into
/// `artifact_dir`, versioned by `trained_at`.
pub async fn train_and_persist(
    transactions: &TransactionRepository,
    artifact_dir: &Path,
    l2_penalty: f64,
    trained_at: DateTime<Utc>,
) -> Result<TrainingReport, EngineError> {
    let rows = transactions
        .load_all()
        .await
        .map_err(|e| EngineError::Database(format!("{:#}", e)))?;
    let total = transactions
        .count()
        .await
        .map_err(|e| EngineError::Database(format!("{:#}", e)))?;
    let skipped_rows = usize::try_from(total)
        .unwrap_or(0)
        .saturating_sub(rows.len());
    info!("Loaded {} resale transactions for training", rows.len());
    if skipped_rows > 0 {
        warn!(
            "Skipped {} of {} resale transactions with missing columns",
            skipped_rows, total
        );
    }

    let (pipeline, stats) = fit_pipeline(&rows, l2_penalty)?;
    let feature_count = pipeline.encoder().width();

    let artifact = ModelArtifact::new(pipeline, trained_at, rows.len())?;
    let path = artifact.write_new(artifact_dir)?;

    info!(
        "Model trained and saved as {} (rows={}, features={}, rmse={:.2}, r2={:.4})",
        path.display(),
        rows.len(),
        feature_count,
        stats.rmse,
        stats.r_squared
    );

    Ok(TrainingReport {
        version: artifact.version,
        path,
        training_rows: rows.len(),
        skipped_rows,
        feature_count,
        rmse: stats.rmse,
        r_squared: stats.r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_stats_perfect_fit() {
        let stats = fit_stats(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(stats.rmse, 0.0);
        assert_eq!(stats.r_squared, 1.0);
    }

    #[test]
    fn test_fit_stats_mean_predictor() {
        let stats = fit_stats(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!((stats.r_squared - 0.0).abs() < 1e-12);
        assert!((stats.rmse - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_training_set_fails() {
        assert!(matches!(
            fit_pipeline(&[], 1e-6),
            Err(EngineError::Training(_))
        ));
    }
}
