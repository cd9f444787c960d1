//! Price Explainer
//!
//! A 2-3 sentence justification of a predicted price, produced by the LLM.

use sdk::errors::EngineError;
use sdk::types::{HousingUnitDescriptor, PriceQuote};
use std::sync::Arc;

use crate::llm::{GenerationOptions, LLMProvider, Message};

pub struct PriceExplainer {
    llm: Arc<dyn LLMProvider>,
    temperature: f64,
}

impl PriceExplainer {
    pub fn new(llm: Arc<dyn LLMProvider>, temperature: f64) -> Self {
        Self { llm, temperature }
    }

    pub fn prompt(descriptor: &HousingUnitDescriptor, quote: &PriceQuote) -> String {
        format!(
            "You are a real estate assistant.\n\
            Given a flat with the following details:\n\
            Town: {}\n\
            Flat type: {}\n\
            Storey range: {}\n\
            Floor area: {} sqm\n\
            Flat model: {}\n\
            Remaining lease: {} years\n\
            Predicted price: {}\n\n\
            Explain in 2-3 sentences why this price makes sense compared to similar \
            flats in the area.",
            descriptor.region,
            descriptor.unit_type,
            descriptor.storey_range,
            descriptor.floor_area_sqm,
            descriptor.unit_model,
            descriptor.remaining_lease_years,
            quote.predicted_price,
        )
    }

    pub async fn explain(
        &self,
        descriptor: &HousingUnitDescriptor,
        quote: &PriceQuote,
    ) -> Result<String, EngineError> {
        let messages = [Message::user(Self::prompt(descriptor, quote))];
        Ok(self
            .llm
            .generate(&messages, GenerationOptions::text(self.temperature))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_descriptor_and_price() {
        let descriptor = HousingUnitDescriptor {
            region: "TAMPINES".to_string(),
            unit_type: "5 ROOM".to_string(),
            storey_range: "13 TO 15".to_string(),
            floor_area_sqm: 121.0,
            unit_model: "Improved".to_string(),
            remaining_lease_years: 72.0,
        };
        let quote = PriceQuote {
            predicted_price: 615000.5,
            discounted_price: None,
            model_version: "price_model_v202401011200.json".to_string(),
            explanation: None,
        };

        let prompt = PriceExplainer::prompt(&descriptor, &quote);
        assert!(prompt.contains("Town: TAMPINES"));
        assert!(prompt.contains("Floor area: 121 sqm"));
        assert!(prompt.contains("Predicted price: 615000.5"));
    }
}
