//! Plan and execution result types
//!
//! An `ActionStep` keeps the verb and target exactly as the planner emitted
//! them. They are parsed into `Verb` / `Target` only when the step runs, so an
//! unrecognised value fails that one step instead of the whole plan.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// HTTP-style verb of a plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub fn as_str(&self) -> &str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            _ => Err(EngineError::UnknownVerb(s.to_string())),
        }
    }
}

/// The two data services a plan may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Aggregation query over launch records
    TopRegions,
    /// Price model service
    PredictPrice,
}

impl Target {
    pub fn identifier(&self) -> &'static str {
        match self {
            Target::TopRegions => "/bto/town_reco",
            Target::PredictPrice => "/predict_price",
        }
    }

    /// The verb this target is served under
    pub fn verb(&self) -> Verb {
        match self {
            Target::TopRegions => Verb::Get,
            Target::PredictPrice => Verb::Post,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Target {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('/');
        match normalized {
            "bto/town_reco" => Ok(Target::TopRegions),
            "predict_price" => Ok(Target::PredictPrice),
            _ => Err(EngineError::UnknownTarget(s.to_string())),
        }
    }
}

/// One typed action produced by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    #[serde(rename = "action")]
    pub verb: String,

    #[serde(rename = "endpoint")]
    pub target: String,

    #[serde(default)]
    pub params: Map<String, Value>,
}

impl ActionStep {
    /// Create a step for a known target
    pub fn new(target: Target) -> Self {
        Self {
            verb: target.verb().to_string(),
            target: target.identifier().to_string(),
            params: Map::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn parsed_verb(&self) -> Result<Verb, EngineError> {
        self.verb.parse()
    }

    pub fn parsed_target(&self) -> Result<Target, EngineError> {
        self.target.parse()
    }

    /// Resolve the verb/target pair, rejecting combinations no service serves
    pub fn route(&self) -> Result<Target, EngineError> {
        let target = self.parsed_target()?;
        let verb = self.parsed_verb()?;
        if target.verb() != verb {
            return Err(EngineError::UnsupportedAction {
                verb: self.verb.clone(),
                target: self.target.clone(),
            });
        }
        Ok(target)
    }

    /// Whether a parameter (or one of its aliases) is present and non-null
    pub fn has_param(&self, names: &[&str]) -> bool {
        names
            .iter()
            .any(|name| self.params.get(*name).is_some_and(|v| !v.is_null()))
    }

    /// Insert `value` under `key` unless the parameter is already present
    pub fn set_default(&mut self, names: &[&str], key: &str, value: Value) -> bool {
        if self.has_param(names) {
            return false;
        }
        self.params.insert(key.to_string(), value);
        true
    }

    /// Get an optional string parameter
    pub fn param_str_opt(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    /// Parameters as a JSON object
    pub fn params_value(&self) -> Value {
        Value::Object(self.params.clone())
    }
}

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success { response: Value },
    Failure { error: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success { .. })
    }

    pub fn response(&self) -> Option<&Value> {
        match self {
            StepOutcome::Success { response } => Some(response),
            StepOutcome::Failure { .. } => None,
        }
    }
}

/// One action paired with its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub action: ActionStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Ordered results, exactly one per planned action, in plan order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanExecutionResult {
    pub steps: Vec<StepRecord>,
}

impl PlanExecutionResult {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter()
    }

    pub fn failure_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.outcome.is_success()).count()
    }
}

/// Aggregate response of an agent query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub summary: String,
    pub plan: Vec<ActionStep>,
    pub results: PlanExecutionResult,
}
