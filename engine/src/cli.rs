//! CLI interface for the resale advisor
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resale Advisor
///
/// Predicts public housing resale prices, ranks regions by new-flat launches,
/// and answers free-form housing questions through an LLM planner.
#[derive(Parser, Debug)]
#[command(name = "resale")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a new price model from the stored resale transactions
    Train,

    /// List the model artifacts on disk, newest first
    Models,

    /// Predict the resale price of a flat
    Predict {
        /// Town, e.g. "ANG MO KIO"
        #[arg(long)]
        region: String,

        /// Flat type, e.g. "4 ROOM"
        #[arg(long)]
        unit_type: String,

        /// Storey range, e.g. "10 TO 12"
        #[arg(long)]
        storey_range: String,

        /// Floor area in square metres
        #[arg(long)]
        floor_area_sqm: f64,

        /// Flat model, e.g. "New Generation"
        #[arg(long)]
        unit_model: String,

        /// Remaining lease in years
        #[arg(long)]
        remaining_lease_years: f64,

        /// Percentage of the predicted price to report as the discounted price
        #[arg(long)]
        discount: Option<f64>,

        /// Ask the LLM to explain the predicted price
        #[arg(long)]
        explain: bool,
    },

    /// Rank regions by number of launches completed in recent years
    TopRegions {
        /// highest or lowest
        #[arg(long)]
        direction: Option<String>,

        /// How many years back to count
        #[arg(long)]
        window_years: Option<i64>,

        /// Number of regions to return
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Ask a free-form question
    Ask {
        /// The question to answer
        question: String,
    },

    /// Show request counters and the serving model version
    Metrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["resale", "models"]);
        assert!(matches!(cli.command, Command::Models));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["resale", "--json", "--log", "debug", "metrics"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
    }

    #[test]
    fn test_predict_command() {
        let cli = Cli::parse_from([
            "resale",
            "predict",
            "--region",
            "ANG MO KIO",
            "--unit-type",
            "4 ROOM",
            "--storey-range",
            "04 TO 06",
            "--floor-area-sqm",
            "100",
            "--unit-model",
            "Model A",
            "--remaining-lease-years",
            "85",
            "--discount",
            "100",
        ]);
        if let Command::Predict {
            region,
            floor_area_sqm,
            discount,
            explain,
            ..
        } = cli.command
        {
            assert_eq!(region, "ANG MO KIO");
            assert_eq!(floor_area_sqm, 100.0);
            assert_eq!(discount, Some(100.0));
            assert!(!explain);
        } else {
            panic!("Expected Predict command");
        }
    }

    #[test]
    fn test_top_regions_command() {
        let cli = Cli::parse_from(["resale", "top-regions", "--direction", "lowest", "--limit", "3"]);
        if let Command::TopRegions {
            direction,
            window_years,
            limit,
        } = cli.command
        {
            assert_eq!(direction.as_deref(), Some("lowest"));
            assert_eq!(window_years, None);
            assert_eq!(limit, Some(3));
        } else {
            panic!("Expected TopRegions command");
        }
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from(["resale", "ask", "Where should a young couple buy?"]);
        if let Command::Ask { question } = cli.command {
            assert_eq!(question, "Where should a young couple buy?");
        } else {
            panic!("Expected Ask command");
        }
    }
}
