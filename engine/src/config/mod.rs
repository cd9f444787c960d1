//! Configuration management
//!
//! This module handles loading, validation, and management of the advisor
//! configuration. Configuration is stored in TOML format at
//! ~/.resale-advisor/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **store**: SQLite reference store location
//! - **model**: Artifact directory and solver settings
//! - **llm**: LLM provider settings
//! - **agent**: Plan execution settings and planner defaults
//!
//! # Examples
//!
//! ```no_run
//! use resale_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Artifacts: {:?}", config.model.artifact_dir);
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::{Direction, HousingUnitDescriptor, TopRegionsQuery};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    pub core: CoreConfig,

    /// Reference store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Price model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// LLM provider configuration
    pub llm: LLMConfig,

    /// Agent settings
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// SQLite reference store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file holding `bto_launches` and `resale_prices`
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Price model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory scanned for `price_model_v*.json` artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Ridge penalty added to the normal equations
    #[serde(default = "default_l2_penalty")]
    pub l2_penalty: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            l2_penalty: default_l2_penalty(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (openai, ollama)
    pub default_provider: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// HTTP timeout for provider calls. Unset means calls may block indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from OPENAI_API_KEY or the OS keychain, not config
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Run independent plan steps concurrently. Results keep plan order.
    #[serde(default)]
    pub parallel_steps: bool,

    /// Per-step timeout. Unset means a hung step stalls the request.
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,

    /// Values substituted for price-step fields the question leaves open
    #[serde(default)]
    pub defaults: PlannerDefaults,

    /// Values substituted for top-region-step fields the question leaves open
    #[serde(default)]
    pub region_defaults: RegionDefaults,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            parallel_steps: false,
            step_timeout_secs: None,
            defaults: PlannerDefaults::default(),
            region_defaults: RegionDefaults::default(),
        }
    }
}

/// Default housing unit used by the planner.
///
/// These are not checked against the encoder vocabulary; if the training
/// data changes, a stale default simply encodes as an unseen category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerDefaults {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_unit_type")]
    pub unit_type: String,

    #[serde(default = "default_storey_range")]
    pub storey_range: String,

    #[serde(default = "default_floor_area")]
    pub floor_area_sqm: f64,

    #[serde(default = "default_unit_model")]
    pub unit_model: String,

    #[serde(default = "default_remaining_lease")]
    pub remaining_lease_years: f64,

    #[serde(default = "default_discount")]
    pub discount: f64,
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        Self {
            region: default_region(),
            unit_type: default_unit_type(),
            storey_range: default_storey_range(),
            floor_area_sqm: default_floor_area(),
            unit_model: default_unit_model(),
            remaining_lease_years: default_remaining_lease(),
            discount: default_discount(),
        }
    }
}

impl PlannerDefaults {
    pub fn descriptor(&self) -> HousingUnitDescriptor {
        HousingUnitDescriptor {
            region: self.region.clone(),
            unit_type: self.unit_type.clone(),
            storey_range: self.storey_range.clone(),
            floor_area_sqm: self.floor_area_sqm,
            unit_model: self.unit_model.clone(),
            remaining_lease_years: self.remaining_lease_years,
        }
    }
}

/// Default top-regions query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDefaults {
    #[serde(default)]
    pub direction: Direction,

    #[serde(default = "default_window_years")]
    pub window_years: u32,

    #[serde(default = "default_region_limit")]
    pub limit: u32,
}

impl Default for RegionDefaults {
    fn default() -> Self {
        Self {
            direction: Direction::Highest,
            window_years: default_window_years(),
            limit: default_region_limit(),
        }
    }
}

impl RegionDefaults {
    pub fn query(&self) -> TopRegionsQuery {
        TopRegionsQuery {
            direction: self.direction,
            window_years: self.window_years,
            limit: self.limit,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.resale-advisor")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("~/.resale-advisor/hdb_data.db")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("~/.resale-advisor/models")
}

fn default_l2_penalty() -> f64 {
    1e-6
}

fn default_temperature() -> f64 {
    0.5
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_region() -> String {
    "ANG MO KIO".to_string()
}

fn default_unit_type() -> String {
    "4 ROOM".to_string()
}

fn default_storey_range() -> String {
    "10 TO 12".to_string()
}

fn default_floor_area() -> f64 {
    92.0
}

fn default_unit_model() -> String {
    "New generation".to_string()
}

fn default_remaining_lease() -> f64 {
    80.0
}

fn default_discount() -> f64 {
    20.0
}

fn default_window_years() -> u32 {
    10
}

fn default_region_limit() -> u32 {
    1
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: "openai".to_string(),
            temperature: default_temperature(),
            request_timeout_secs: None,
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.resale-advisor/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();

        // Serialize before path expansion so the file keeps the portable ~ form
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        config.validate_and_process()?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.resale-advisor/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".resale-advisor").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            store: StoreConfig::default(),
            model: ModelConfig::default(),
            llm: LLMConfig::default(),
            agent: AgentConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated and numeric fields
    /// - Expands ~ in paths
    /// - Creates the data directory if it doesn't exist
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if !self.model.l2_penalty.is_finite() || self.model.l2_penalty <= 0.0 {
            return Err(EngineError::Config(
                "l2_penalty must be a finite number > 0".to_string(),
            ));
        }

        if self.agent.region_defaults.limit == 0 {
            return Err(EngineError::Config(
                "agent.region_defaults.limit must be at least 1".to_string(),
            ));
        }

        if matches!(self.agent.step_timeout_secs, Some(0)) {
            return Err(EngineError::Config(
                "agent.step_timeout_secs must be at least 1 when set".to_string(),
            ));
        }

        // The default descriptor must itself be a valid prediction input
        self.agent
            .defaults
            .descriptor()
            .validate()
            .map_err(|e| EngineError::Config(format!("Invalid agent.defaults: {}", e)))?;
        sdk::types::validate_discount(self.agent.defaults.discount)
            .map_err(|e| EngineError::Config(format!("Invalid agent.defaults: {}", e)))?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.store.database_path = expand_path(&self.store.database_path)?;
        self.model.artifact_dir = expand_path(&self.model.artifact_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
