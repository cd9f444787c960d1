//! Error types and handling
//!
//! This module provides the error types used throughout the resale advisor.
//! All errors implement the `AdvisorErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry API keys or raw provider credentials. Text that
//! originates from an LLM provider is scrubbed by the engine before it is
//! wrapped in an `EngineError`.

use thiserror::Error;

/// Trait for advisor error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait AdvisorErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be fixed by the caller (bad input, a flaky
    /// provider). Non-recoverable errors need operator intervention, such as
    /// a missing or corrupted model artifact.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite reference store failures
/// - **LLM Provider**: API failures, authentication errors
/// - **Validation**: Malformed client input, rejected before prediction
/// - **Model**: Artifact discovery, loading and training failures
/// - **Plan**: Plan generation and per-step execution failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{AdvisorErrorExt, EngineError};
///
/// let error = EngineError::Validation {
///     field: "floor_area_sqm".to_string(),
///     reason: "must be greater than 0".to_string(),
/// };
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::ModelNotFound("models".into());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Client input errors
    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    // Model artifact errors
    #[error("No model artifact found in {0:?}")]
    ModelNotFound(std::path::PathBuf),

    #[error("Failed to load model artifact: {0}")]
    ModelLoad(String),

    #[error("Model artifact already exists: {0}")]
    ArtifactExists(String),

    #[error("Training failed: {0}")]
    Training(String),

    // Plan generation errors
    #[error("Failed to parse plan: {0}")]
    PlanParse(String),

    // Plan step errors
    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Unsupported action: {verb} {target}")]
    UnsupportedAction { verb: String, target: String },

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Step timed out after {0}s")]
    StepTimeout(u64),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for a validation error on a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::MissingParameter(_) | Self::InvalidParameter { .. }
        )
    }
}

impl AdvisorErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Reference data store unavailable. Check the database path",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",

            Self::Validation { .. } => "Check the housing unit fields and try again",

            Self::ModelNotFound(_) => "No trained model found. Run 'resale train' first",
            Self::ModelLoad(_) => "Model artifact is unreadable. Retrain the model",
            Self::ArtifactExists(_) => "A model was already trained this minute. Try again later",
            Self::Training(_) => "Training failed. Check the resale transaction data",

            Self::PlanParse(_) => "The assistant produced an invalid plan. Rephrase the question",
            Self::UnknownVerb(_) | Self::UnknownTarget(_) | Self::UnsupportedAction { .. } => {
                "The plan referenced an unknown action"
            }
            Self::MissingParameter(_) | Self::InvalidParameter { .. } => {
                "The plan step had invalid parameters"
            }
            Self::StepTimeout(_) => "A plan step took too long. Try again",

            Self::KeyringError(_) => "Failed to access secure storage. Set OPENAI_API_KEY instead",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::ModelNotFound(_) | Self::ModelLoad(_) | Self::Config(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
