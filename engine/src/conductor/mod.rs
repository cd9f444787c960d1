//! Conductor System
//!
//! Answers a free-form question in three strictly sequential stages:
//! plan generation, plan execution, and narrative synthesis. Each stage's
//! output is the next stage's entire input.

pub mod executor;
pub mod explainer;
pub mod narrator;
pub mod planner;

pub use executor::{ExecutorOptions, PlanExecutor, PricePredictor, RegionQuery};
pub use explainer::PriceExplainer;
pub use narrator::NarrativeSynthesizer;
pub use planner::{parse_plan, PlanGenerator};

use sdk::errors::EngineError;
use sdk::plan::AgentReport;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::{AgentConfig, LLMConfig};
use crate::llm::LLMProvider;

pub struct Conductor {
    planner: PlanGenerator,
    executor: PlanExecutor,
    narrator: NarrativeSynthesizer,
}

impl Conductor {
    pub fn new(planner: PlanGenerator, executor: PlanExecutor, narrator: NarrativeSynthesizer) -> Self {
        Self {
            planner,
            executor,
            narrator,
        }
    }

    /// Wire the three stages from configuration
    pub fn from_config(
        llm: Arc<dyn LLMProvider>,
        regions: Arc<dyn RegionQuery>,
        prices: Arc<dyn PricePredictor>,
        agent: &AgentConfig,
        llm_config: &LLMConfig,
    ) -> Self {
        let planner = PlanGenerator::new(
            Arc::clone(&llm),
            agent.defaults.clone(),
            agent.region_defaults.clone(),
        );
        let executor = PlanExecutor::new(regions, prices, agent.region_defaults.query())
            .with_options(ExecutorOptions {
                parallel: agent.parallel_steps,
                step_timeout: agent.step_timeout_secs.map(Duration::from_secs),
            });
        let narrator = NarrativeSynthesizer::new(llm, llm_config.temperature);

        Self::new(planner, executor, narrator)
    }

    /// Plan, execute and summarize one question.
    ///
    /// Fails if the plan cannot be generated or parsed, or if the narrator
    /// call fails. Individual step failures are reported in the results.
    pub async fn run(&self, query: &str) -> Result<AgentReport, EngineError> {
        if query.trim().is_empty() {
            return Err(EngineError::validation("query", "must not be empty"));
        }

        let start = Instant::now();
        info!("Agent query received ({} chars)", query.len());

        let plan = self.planner.generate_plan(query).await?;
        let results = self.executor.execute(&plan).await;
        let summary = self.narrator.summarize(query, &results).await?;

        info!(
            "Agent query answered in {:.2}s: {} step(s), {} failed",
            start.elapsed().as_secs_f64(),
            results.len(),
            results.failure_count()
        );

        Ok(AgentReport {
            summary,
            plan,
            results,
        })
    }
}
