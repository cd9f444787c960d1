//! Plan Executor
//!
//! Runs each `ActionStep` against the aggregation query service or the price
//! model. The executor is stateless between steps; any data flow between
//! steps was decided by the planner when it wrote the parameters.
//!
//! A failing step is recorded inline and never aborts its siblings. The
//! result always holds exactly one record per action, in plan order.

use async_trait::async_trait;
use futures::future::join_all;
use sdk::errors::EngineError;
use sdk::plan::{ActionStep, PlanExecutionResult, StepOutcome, StepRecord, Target};
use sdk::types::{
    HousingUnitDescriptor, PredictPriceRequest, PriceQuote, TopRegions, TopRegionsQuery,
    TopRegionsRequest,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::planner::required_price_params;

/// Backend for top-regions steps
#[async_trait]
pub trait RegionQuery: Send + Sync {
    async fn top_regions(&self, query: TopRegionsQuery) -> Result<TopRegions, EngineError>;
}

/// Backend for price steps
#[async_trait]
pub trait PricePredictor: Send + Sync {
    async fn predict(
        &self,
        descriptor: &HousingUnitDescriptor,
        discount: Option<f64>,
    ) -> Result<PriceQuote, EngineError>;
}

/// How steps are scheduled
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorOptions {
    /// Run all steps concurrently instead of one after another
    pub parallel: bool,

    /// Fail a step that runs longer than this
    pub step_timeout: Option<Duration>,
}

pub struct PlanExecutor {
    regions: Arc<dyn RegionQuery>,
    prices: Arc<dyn PricePredictor>,
    region_defaults: TopRegionsQuery,
    options: ExecutorOptions,
}

impl PlanExecutor {
    pub fn new(
        regions: Arc<dyn RegionQuery>,
        prices: Arc<dyn PricePredictor>,
        region_defaults: TopRegionsQuery,
    ) -> Self {
        Self {
            regions,
            prices,
            region_defaults,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute every action, returning one record per action in input order
    pub async fn execute(&self, actions: &[ActionStep]) -> PlanExecutionResult {
        let start = Instant::now();

        let steps = if self.options.parallel {
            join_all(
                actions
                    .iter()
                    .enumerate()
                    .map(|(index, action)| self.run_step(index, action)),
            )
            .await
        } else {
            let mut steps = Vec::with_capacity(actions.len());
            for (index, action) in actions.iter().enumerate() {
                steps.push(self.run_step(index, action).await);
            }
            steps
        };

        let result = PlanExecutionResult { steps };
        info!(
            "Executed {} step(s) in {:.2}s, {} failed",
            result.len(),
            start.elapsed().as_secs_f64(),
            result.failure_count()
        );
        result
    }

    async fn run_step(&self, index: usize, action: &ActionStep) -> StepRecord {
        debug!("Step {}: {} {}", index, action.verb, action.target);

        let outcome = match self.options.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.dispatch(action)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::StepTimeout(limit.as_secs())),
            },
            None => self.dispatch(action).await,
        };

        let outcome = match outcome {
            Ok(response) => {
                info!("Step {} ({} {}) succeeded", index, action.verb, action.target);
                StepOutcome::Success { response }
            }
            Err(e) => {
                warn!(
                    "Step {} ({} {}) failed: {}",
                    index, action.verb, action.target, e
                );
                StepOutcome::Failure {
                    error: e.to_string(),
                }
            }
        };

        StepRecord {
            action: action.clone(),
            outcome,
        }
    }

    /// Route one action to its backend
    pub async fn dispatch(&self, action: &ActionStep) -> Result<Value, EngineError> {
        match action.route()? {
            Target::TopRegions => {
                let query = TopRegionsRequest::from_value(action.params_value())
                    .and_then(|request| request.resolve(self.region_defaults))
                    .map_err(into_parameter_error)?;
                to_response(&self.regions.top_regions(query).await?)
            }
            Target::PredictPrice => {
                for (names, name) in required_price_params() {
                    if !action.has_param(names) {
                        return Err(EngineError::MissingParameter(name.to_string()));
                    }
                }
                let (descriptor, discount) = PredictPriceRequest::from_value(action.params_value())
                    .and_then(PredictPriceRequest::into_parts)
                    .map_err(into_parameter_error)?;
                to_response(&self.prices.predict(&descriptor, discount).await?)
            }
        }
    }
}

fn into_parameter_error(err: EngineError) -> EngineError {
    match err {
        EngineError::Validation { field, reason } => EngineError::InvalidParameter {
            name: field,
            reason,
        },
        other => other,
    }
}

fn to_response<T: Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value)
        .map_err(|e| EngineError::validation("response", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::{Direction, RegionCount};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRegions;

    #[async_trait]
    impl RegionQuery for FixedRegions {
        async fn top_regions(&self, query: TopRegionsQuery) -> Result<TopRegions, EngineError> {
            if query.window_years == 0 {
                return Ok(TopRegions::NoData);
            }
            Ok(TopRegions::Regions(vec![RegionCount {
                region: format!("{}-{}", query.direction, query.limit),
                count: 7,
            }]))
        }
    }

    #[derive(Default)]
    struct CountingPrices {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PricePredictor for CountingPrices {
        async fn predict(
            &self,
            descriptor: &HousingUnitDescriptor,
            discount: Option<f64>,
        ) -> Result<PriceQuote, EngineError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(PriceQuote {
                predicted_price: descriptor.floor_area_sqm * 5000.0,
                discounted_price: discount.map(|d| descriptor.floor_area_sqm * 50.0 * d),
                model_version: "test".to_string(),
                explanation: None,
            })
        }
    }

    fn defaults() -> TopRegionsQuery {
        TopRegionsQuery {
            direction: Direction::Highest,
            window_years: 10,
            limit: 1,
        }
    }

    fn executor() -> (PlanExecutor, Arc<CountingPrices>) {
        let prices = Arc::new(CountingPrices::default());
        let executor = PlanExecutor::new(Arc::new(FixedRegions), Arc::clone(&prices) as _, defaults());
        (executor, prices)
    }

    fn price_step(town: &str) -> ActionStep {
        ActionStep::new(Target::PredictPrice)
            .with_param("town", json!(town))
            .with_param("flat_type", json!("4 ROOM"))
            .with_param("storey_range", json!("10 TO 12"))
            .with_param("floor_area_sqm", json!(92))
            .with_param("flat_model", json!("New Generation"))
            .with_param("remaining_lease", json!(80))
            .with_param("discount", json!(20))
    }

    #[tokio::test]
    async fn test_failures_recorded_in_place() {
        let (executor, prices) = executor();
        let actions = vec![
            ActionStep::new(Target::TopRegions).with_param("type", json!("lowest")),
            ActionStep {
                verb: "DELETE".to_string(),
                target: "/bto/town_reco".to_string(),
                params: Default::default(),
            },
            price_step("BEDOK"),
            ActionStep {
                verb: "GET".to_string(),
                target: "/weather".to_string(),
                params: Default::default(),
            },
        ];

        let result = executor.execute(&actions).await;
        assert_eq!(result.len(), 4);
        assert_eq!(result.failure_count(), 2);

        for (record, action) in result.iter().zip(&actions) {
            assert_eq!(&record.action, action);
        }
        assert_eq!(
            result.steps[0].outcome.response().unwrap()[0]["region"],
            "lowest-1"
        );
        assert!(matches!(
            &result.steps[1].outcome,
            StepOutcome::Failure { error } if error.contains("DELETE")
        ));
        assert_eq!(
            result.steps[2].outcome.response().unwrap()["predicted_price"],
            460000.0
        );
        assert_eq!(prices.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_missing_price_parameter() {
        let (executor, prices) = executor();
        let mut step = price_step("BEDOK");
        step.params.remove("storey_range");

        let err = executor.dispatch(&step).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingParameter(ref p) if p == "storey_range"));
        assert_eq!(prices.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_invalid_parameter() {
        let (executor, _) = executor();
        let step = price_step("BEDOK").with_param("floor_area_sqm", json!(-3));
        let err = executor.dispatch(&step).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { ref name, .. } if name == "floor_area_sqm"));

        let step = ActionStep::new(Target::TopRegions).with_param("limit", json!(0));
        let err = executor.dispatch(&step).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { ref name, .. } if name == "limit"));
    }

    #[tokio::test]
    async fn test_no_data_is_a_successful_step() {
        let (executor, _) = executor();
        let step = ActionStep::new(Target::TopRegions).with_param("window_years", json!(0));
        let response = executor.dispatch(&step).await.unwrap();
        assert_eq!(response, json!({"message": "no data"}));
    }

    #[tokio::test]
    async fn test_parallel_keeps_order() {
        let (executor, _) = executor();
        let executor = executor.with_options(ExecutorOptions {
            parallel: true,
            step_timeout: Some(Duration::from_secs(5)),
        });
        let actions: Vec<_> = ["A", "B", "C", "D"].iter().map(|t| price_step(t)).collect();

        let result = executor.execute(&actions).await;
        let towns: Vec<_> = result
            .iter()
            .map(|r| r.action.param_str_opt("town").unwrap().to_string())
            .collect();
        assert_eq!(towns, vec!["A", "B", "C", "D"]);
        assert_eq!(result.failure_count(), 0);
    }

    struct SlowRegions;

    #[async_trait]
    impl RegionQuery for SlowRegions {
        async fn top_regions(&self, _query: TopRegionsQuery) -> Result<TopRegions, EngineError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(TopRegions::NoData)
        }
    }

    #[tokio::test]
    async fn test_step_timeout() {
        let executor = PlanExecutor::new(
            Arc::new(SlowRegions),
            Arc::new(CountingPrices::default()),
            defaults(),
        )
        .with_options(ExecutorOptions {
            parallel: false,
            step_timeout: Some(Duration::from_millis(50)),
        });

        let result = executor
            .execute(&[ActionStep::new(Target::TopRegions), price_step("BEDOK")])
            .await;
        assert_eq!(result.len(), 2);
        assert!(matches!(
            &result.steps[0].outcome,
            StepOutcome::Failure { error } if error.contains("timed out")
        ));
        assert!(result.steps[1].outcome.is_success());
    }
}
