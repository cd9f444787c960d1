//! Advisor service facade
//!
//! The operations a client can call: price prediction (optionally explained),
//! top regions by launch count, free-form agent questions, and metrics.
//! Every call is counted once, and once more as an error if it fails.

use sdk::errors::EngineError;
use sdk::plan::AgentReport;
use sdk::types::{
    MetricsSnapshot, PredictPriceRequest, PriceQuote, TopRegions, TopRegionsQuery,
    TopRegionsRequest,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::conductor::{Conductor, PriceExplainer};
use crate::config::Config;
use crate::db::Database;
use crate::llm::{build_provider, LLMProvider};
use crate::metrics::Metrics;
use crate::model::PriceModel;
use crate::query::AggregationService;
use crate::secrets::{SecretManager, SERVICE_NAME};

const NO_LLM_MESSAGE: &str = "no language model provider is configured";

pub struct AdvisorService {
    model: Arc<PriceModel>,
    aggregation: Arc<AggregationService>,
    region_defaults: TopRegionsQuery,
    conductor: Option<Conductor>,
    explainer: Option<PriceExplainer>,
    metrics: Metrics,
}

impl AdvisorService {
    /// Assemble the service. Without an LLM provider, price and region
    /// queries still work; agent questions and explanations fail.
    pub fn new(
        model: PriceModel,
        aggregation: AggregationService,
        config: &Config,
        llm: Option<Arc<dyn LLMProvider>>,
    ) -> Self {
        let model = Arc::new(model);
        let aggregation = Arc::new(aggregation);
        let metrics = Metrics::new(model.version());

        let (conductor, explainer) = match llm {
            Some(llm) => {
                let conductor = Conductor::from_config(
                    Arc::clone(&llm),
                    Arc::clone(&aggregation) as _,
                    Arc::clone(&model) as _,
                    &config.agent,
                    &config.llm,
                );
                let explainer = PriceExplainer::new(llm, config.llm.temperature);
                (Some(conductor), Some(explainer))
            }
            None => (None, None),
        };

        Self {
            model,
            aggregation,
            region_defaults: config.agent.region_defaults.query(),
            conductor,
            explainer,
            metrics,
        }
    }

    /// Open the reference store, load the newest model, and optionally
    /// connect the configured LLM provider.
    ///
    /// A missing model artifact is fatal: the service never trains one.
    pub async fn from_config(config: &Config, with_llm: bool) -> Result<Self, EngineError> {
        let model = PriceModel::load_latest(&config.model.artifact_dir)?;
        info!("Serving model {}", model.version());

        let db = Database::new(&config.store.database_path)
            .await
            .map_err(|e| EngineError::Database(format!("{:#}", e)))?;
        let aggregation = AggregationService::new(db.launches());

        let llm = if with_llm {
            let secrets = SecretManager::new(SERVICE_NAME);
            let provider = build_provider(&config.llm, &secrets)?;
            info!("Using LLM provider {}", provider.name());
            Some(provider)
        } else {
            None
        };

        Ok(Self::new(model, aggregation, config, llm))
    }

    pub fn model_version(&self) -> String {
        self.model.version()
    }

    fn record<T>(&self, operation: &str, result: Result<T, EngineError>) -> Result<T, EngineError> {
        self.metrics.observe(&result);
        if let Err(e) = &result {
            warn!("{} failed: {}", operation, e);
        }
        result
    }

    /// Predict the price of one unit
    pub fn predict_price(&self, request: PredictPriceRequest) -> Result<PriceQuote, EngineError> {
        let result = request
            .into_parts()
            .and_then(|(descriptor, discount)| self.model.quote(&descriptor, discount));
        self.record("predict_price", result)
    }

    /// Predict the price of one unit and ask the LLM to justify it
    pub async fn predict_price_explained(
        &self,
        request: PredictPriceRequest,
    ) -> Result<PriceQuote, EngineError> {
        let result = self.explained_quote(request).await;
        self.record("predict_price_explained", result)
    }

    async fn explained_quote(&self, request: PredictPriceRequest) -> Result<PriceQuote, EngineError> {
        let explainer = self
            .explainer
            .as_ref()
            .ok_or_else(|| EngineError::Config(NO_LLM_MESSAGE.to_string()))?;
        let (descriptor, discount) = request.into_parts()?;
        let mut quote = self.model.quote(&descriptor, discount)?;
        let explanation = explainer.explain(&descriptor, &quote).await?;
        info!("Explanation: {}", explanation);
        quote.explanation = Some(explanation);
        Ok(quote)
    }

    /// Regions ranked by launch count within a window of years
    pub async fn top_regions(&self, request: TopRegionsRequest) -> Result<TopRegions, EngineError> {
        let result = match request.resolve(self.region_defaults) {
            Ok(query) => self.aggregation.top_regions(query).await,
            Err(e) => Err(e),
        };
        self.record("top_regions", result)
    }

    /// Answer a free-form question through the conductor
    pub async fn run_agent_query(&self, query: &str) -> Result<AgentReport, EngineError> {
        let result = match &self.conductor {
            Some(conductor) => conductor.run(query).await,
            None => Err(EngineError::Config(NO_LLM_MESSAGE.to_string())),
        };
        self.record("run_agent_query", result)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
