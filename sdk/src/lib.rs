//! Resale Advisor SDK
//!
//! Shared data model and error types for the resale advisor.
//! This crate has no I/O; it is used by the engine and by any client that
//! speaks to it.

/// Error types and handling
pub mod errors;

/// Plan and execution result types
pub mod plan;

/// Pricing and region query types
pub mod types;

// Re-export commonly used types
pub use errors::{AdvisorErrorExt, EngineError};
pub use plan::{ActionStep, AgentReport, PlanExecutionResult, StepOutcome, StepRecord, Target, Verb};
pub use types::{
    Direction, HousingUnitDescriptor, MetricsSnapshot, PredictPriceRequest, PriceQuote,
    RegionCount, TopRegions, TopRegionsQuery, TopRegionsRequest,
};
