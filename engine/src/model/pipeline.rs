//! Encoder plus regression, fitted together and persisted as one unit

use sdk::errors::EngineError;
use sdk::types::HousingUnitDescriptor;
use serde::{Deserialize, Serialize};

use super::encoder::FeatureEncoder;
use super::regression::LinearRegression;

/// Round to 2 decimal places
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round(predicted * discount / 100, 2)`.
///
/// `discount` is a percentage multiplier: 100 returns the price unchanged and
/// 20 returns one fifth of it.
pub fn apply_discount(predicted_price: f64, discount: f64) -> f64 {
    round_price(predicted_price * discount / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePipeline {
    encoder: FeatureEncoder,
    regression: LinearRegression,
}

impl PricePipeline {
    pub fn new(encoder: FeatureEncoder, regression: LinearRegression) -> Result<Self, EngineError> {
        if encoder.width() != regression.coefficients().len() {
            return Err(EngineError::ModelLoad(format!(
                "encoder width {} does not match {} coefficients",
                encoder.width(),
                regression.coefficients().len()
            )));
        }
        Ok(Self {
            encoder,
            regression,
        })
    }

    /// Fit the encoder vocabulary and the regression jointly
    pub fn fit(
        descriptors: &[HousingUnitDescriptor],
        prices: &[f64],
        l2_penalty: f64,
    ) -> Result<Self, EngineError> {
        let encoder = FeatureEncoder::fit(descriptors);
        let rows: Vec<Vec<f64>> = descriptors.iter().map(|d| encoder.encode(d)).collect();
        let regression = LinearRegression::fit(&rows, prices, l2_penalty)?;
        Self::new(encoder, regression)
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn regression(&self) -> &LinearRegression {
        &self.regression
    }

    /// Unrounded, unclamped model output
    pub fn predict_raw(&self, descriptor: &HousingUnitDescriptor) -> f64 {
        self.regression.predict(&self.encoder.encode(descriptor))
    }

    /// Predicted price: clamped at 0 and rounded to 2 decimal places
    pub fn predict(&self, descriptor: &HousingUnitDescriptor) -> f64 {
        let raw = self.predict_raw(descriptor);
        if raw.is_finite() {
            round_price(raw.max(0.0))
        } else {
            0.0
        }
    }
}
