//! Resale Advisor Engine Library
//!
//! This library provides the core functionality of the resale advisor.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// SQLite reference store module
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// Price model: encoder, regression, artifacts and registry
pub mod model;

/// Aggregation query service over launch records
pub mod query;

/// Conductor orchestration module
pub mod conductor;

/// Request counters
pub mod metrics;

/// Service facade used by the CLI
pub mod service;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
