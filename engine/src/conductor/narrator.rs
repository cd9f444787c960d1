//! Narrative Synthesizer
//!
//! Turns raw step results into a readable report. The reply is passed
//! through as-is; nothing parses it.

use sdk::errors::EngineError;
use sdk::plan::PlanExecutionResult;
use std::sync::Arc;
use tracing::debug;

use crate::llm::{GenerationOptions, LLMProvider, Message};

const NARRATOR_INSTRUCTIONS: &str = "You are a public housing advisor. Using only the data \
provided, write a short report for the user that covers:\n\
1. Recommended regions, and why\n\
2. Price insights for the flats that were priced\n\
3. Suggested household income brackets that could afford them\n\
If a step failed or returned no data, say so plainly instead of guessing.";

pub struct NarrativeSynthesizer {
    llm: Arc<dyn LLMProvider>,
    temperature: f64,
}

impl NarrativeSynthesizer {
    pub fn new(llm: Arc<dyn LLMProvider>, temperature: f64) -> Self {
        Self { llm, temperature }
    }

    fn user_message(query: &str, results: &PlanExecutionResult) -> Result<String, EngineError> {
        let data = serde_json::to_string_pretty(results)
            .map_err(|e| EngineError::validation("results", e.to_string()))?;
        Ok(format!("Question: {}\n\nData:\n{}", query, data))
    }

    /// Summarize `results` as an answer to `query`
    pub async fn summarize(
        &self,
        query: &str,
        results: &PlanExecutionResult,
    ) -> Result<String, EngineError> {
        let messages = [
            Message::system(NARRATOR_INSTRUCTIONS),
            Message::user(Self::user_message(query, results)?),
        ];

        let summary = self
            .llm
            .generate(&messages, GenerationOptions::text(self.temperature))
            .await?;
        debug!("Narrator produced {} chars", summary.len());
        Ok(summary)
    }
}
