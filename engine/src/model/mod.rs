//! Price model: feature encoding, regression, artifacts and serving
//!
//! Training is an offline job (`training`). At serving time a single
//! `PriceModel` is built from the newest artifact at startup and shared
//! read-only for the life of the process.

pub mod artifact;
pub mod encoder;
pub mod pipeline;
pub mod registry;
pub mod regression;
pub mod training;

pub use artifact::ModelArtifact;
pub use encoder::FeatureEncoder;
pub use pipeline::{apply_discount, round_price, PricePipeline};
pub use registry::{resolve_latest, select_latest, ArtifactStore, FsArtifactStore, ModelVersion};
pub use regression::LinearRegression;
pub use training::{train_and_persist, TrainingReport};

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{validate_discount, HousingUnitDescriptor, PriceQuote};
use std::path::Path;
use tracing::info;

use crate::conductor::PricePredictor;

/// The loaded model used to answer price requests
#[derive(Debug, Clone)]
pub struct PriceModel {
    artifact: ModelArtifact,
}

impl PriceModel {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    /// Load the newest artifact in `dir`
    pub fn load_latest(dir: &Path) -> Result<Self, EngineError> {
        let store = FsArtifactStore::new(dir);
        Ok(Self::new(resolve_latest(&store)?))
    }

    /// Artifact file name, reported as the model version
    pub fn version(&self) -> String {
        self.artifact.file_name()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Predict the price of one unit, with an optional discount-adjusted price
    pub fn quote(
        &self,
        descriptor: &HousingUnitDescriptor,
        discount: Option<f64>,
    ) -> Result<PriceQuote, EngineError> {
        descriptor.validate()?;
        if let Some(discount) = discount {
            validate_discount(discount)?;
        }

        let predicted_price = self.artifact.pipeline.predict(descriptor);
        let discounted_price = discount.map(|d| apply_discount(predicted_price, d));
        let model_version = self.version();

        info!(
            "Input: {:?}, Predicted: {}, Discounted: {:?}, Model: {}",
            descriptor, predicted_price, discounted_price, model_version
        );

        Ok(PriceQuote {
            predicted_price,
            discounted_price,
            model_version,
            explanation: None,
        })
    }
}

#[async_trait]
impl PricePredictor for PriceModel {
    async fn predict(
        &self,
        descriptor: &HousingUnitDescriptor,
        discount: Option<f64>,
    ) -> Result<PriceQuote, EngineError> {
        self.quote(descriptor, discount)
    }
}
