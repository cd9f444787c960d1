//! Plan Generator
//!
//! Asks the LLM to decompose a question into an ordered list of
//! `ActionStep`s, then validates the reply against the plan schema. The LLM is
//! an untrusted source: anything that is not exactly
//! `{"actions": [{"action": str, "endpoint": str, "params": {...}}, ...]}`
//! is rejected as a whole with `EngineError::PlanParse`. No retries.

use sdk::errors::EngineError;
use sdk::plan::{ActionStep, Target};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{PlannerDefaults, RegionDefaults};
use crate::llm::{extract_json_object, GenerationOptions, LLMProvider, Message};

/// Price-step parameters: accepted names, canonical name
const PRICE_PARAMS: [(&[&str], &str); 6] = [
    (&["town", "region"], "town"),
    (&["flat_type", "unit_type"], "flat_type"),
    (&["storey_range"], "storey_range"),
    (&["floor_area_sqm"], "floor_area_sqm"),
    (&["flat_model", "unit_model"], "flat_model"),
    (&["remaining_lease", "remaining_lease_years"], "remaining_lease"),
];

pub struct PlanGenerator {
    llm: Arc<dyn LLMProvider>,
    defaults: PlannerDefaults,
    region_defaults: RegionDefaults,
}

impl PlanGenerator {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        defaults: PlannerDefaults,
        region_defaults: RegionDefaults,
    ) -> Self {
        Self {
            llm,
            defaults,
            region_defaults,
        }
    }

    /// Instruction template sent as the system message
    pub fn instructions(&self) -> String {
        let d = &self.defaults;
        let r = &self.region_defaults;
        format!(
            "You are a planning assistant for a public housing advisor. Break the user's \
            question into calls to the services below.\n\n\
            Services:\n\
            1. GET /bto/town_reco - regions ranked by the number of new flat launches.\n   \
               params: direction (\"highest\" or \"lowest\", default \"{direction}\"), \
               window_years (integer, default {window}), limit (integer, default {limit})\n\
            2. POST /predict_price - estimated resale price of one flat.\n   \
               params: town, flat_type, storey_range, floor_area_sqm, flat_model, \
               remaining_lease, discount\n\n\
            Steps:\n\
            1. Use /bto/town_reco to find the regions relevant to the question.\n\
            2. For each region, add one /predict_price call for that town.\n\
            3. For any flat detail the question does not state, use these defaults: \
               town=\"{town}\", flat_type=\"{flat_type}\", storey_range=\"{storey}\", \
               floor_area_sqm={area}, flat_model=\"{model}\", remaining_lease={lease}, \
               discount={discount}.\n\n\
            Reply with ONLY a JSON object of this form:\n\
            {{\"actions\": [{{\"action\": \"GET\", \"endpoint\": \"/bto/town_reco\", \
            \"params\": {{\"direction\": \"highest\", \"window_years\": 10, \"limit\": 3}}}}, \
            {{\"action\": \"POST\", \"endpoint\": \"/predict_price\", \
            \"params\": {{\"town\": \"...\", \"flat_type\": \"...\"}}}}]}}",
            direction = r.direction,
            window = r.window_years,
            limit = r.limit,
            town = d.region,
            flat_type = d.unit_type,
            storey = d.storey_range,
            area = d.floor_area_sqm,
            model = d.unit_model,
            lease = d.remaining_lease_years,
            discount = d.discount,
        )
    }

    /// Generate a plan for `query`
    pub async fn generate_plan(&self, query: &str) -> Result<Vec<ActionStep>, EngineError> {
        let messages = [Message::system(self.instructions()), Message::user(query)];

        let content = self
            .llm
            .generate(&messages, GenerationOptions::json(0.0))
            .await?;
        debug!("Planner reply: {} chars", content.len());

        let mut actions = parse_plan(&content)?;
        let filled: usize = actions.iter_mut().map(|a| self.fill_defaults(a)).sum();

        info!(
            "Generated plan with {} action(s), {} default parameter(s) filled",
            actions.len(),
            filled
        );
        Ok(actions)
    }

    /// Fill parameters the planner left out. Steps with an unknown target are
    /// left untouched and fail when executed. Returns how many were filled.
    pub fn fill_defaults(&self, step: &mut ActionStep) -> usize {
        let target = match step.parsed_target() {
            Ok(target) => target,
            Err(_) => {
                warn!("Plan references unknown endpoint '{}'", step.target);
                return 0;
            }
        };

        let d = &self.defaults;
        let r = &self.region_defaults;
        let defaults: Vec<(&[&str], &str, Value)> = match target {
            Target::PredictPrice => {
                let values = [
                    json!(d.region),
                    json!(d.unit_type),
                    json!(d.storey_range),
                    json!(d.floor_area_sqm),
                    json!(d.unit_model),
                    json!(d.remaining_lease_years),
                ];
                PRICE_PARAMS
                    .iter()
                    .zip(values)
                    .map(|((names, key), value)| (*names, *key, value))
                    .chain(std::iter::once((
                        &["discount"][..],
                        "discount",
                        json!(d.discount),
                    )))
                    .collect()
            }
            Target::TopRegions => vec![
                (&["direction", "type"][..], "direction", json!(r.direction)),
                (&["window_years", "duration"][..], "window_years", json!(r.window_years)),
                (&["limit"][..], "limit", json!(r.limit)),
            ],
        };

        let mut filled = 0;
        for (names, key, value) in defaults {
            if step.set_default(names, key, value) {
                filled += 1;
            }
        }
        filled
    }
}

/// Names of the price parameters a price step must carry
pub fn required_price_params() -> impl Iterator<Item = (&'static [&'static str], &'static str)> {
    PRICE_PARAMS.into_iter()
}

/// Strictly parse a planner reply into actions
pub fn parse_plan(content: &str) -> Result<Vec<ActionStep>, EngineError> {
    let candidate = extract_json_object(content)
        .ok_or_else(|| EngineError::PlanParse("reply contains no JSON object".to_string()))?;

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| EngineError::PlanParse(format!("invalid JSON: {}", e)))?;

    let actions = value
        .get("actions")
        .ok_or_else(|| EngineError::PlanParse("missing 'actions' key".to_string()))?
        .as_array()
        .ok_or_else(|| EngineError::PlanParse("'actions' must be an array".to_string()))?;

    actions
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_action(i, entry))
        .collect()
}

fn parse_action(index: usize, entry: &Value) -> Result<ActionStep, EngineError> {
    let object = entry
        .as_object()
        .ok_or_else(|| EngineError::PlanParse(format!("action {} is not an object", index)))?;

    let string_field = |key: &str| -> Result<String, EngineError> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                EngineError::PlanParse(format!("action {}: '{}' must be a string", index, key))
            })
    };

    let params = match object.get("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(EngineError::PlanParse(format!(
                "action {}: 'params' must be an object",
                index
            )))
        }
    };

    Ok(ActionStep {
        verb: string_field("action")?,
        target: string_field("endpoint")?,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_plan() {
        let content = r#"{"actions": [
            {"action": "GET", "endpoint": "/bto/town_reco", "params": {"limit": 3}},
            {"action": "POST", "endpoint": "/predict_price"}
        ]}"#;
        let actions = parse_plan(content).unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].params["limit"], 3);
        assert!(actions[1].params.is_empty());
    }

    #[test]
    fn test_parse_fenced_plan() {
        let content = "```json\n{\"actions\": []}\n```";
        assert!(parse_plan(content).unwrap().is_empty());
    }

    #[test]
    fn test_missing_actions_is_parse_error() {
        let err = parse_plan(r#"{"steps": []}"#).unwrap_err();
        assert!(matches!(err, EngineError::PlanParse(ref m) if m.contains("actions")));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        for content in [
            "not json at all",
            r#"{"actions": {"action": "GET"}}"#,
            r#"{"actions": ["GET /bto/town_reco"]}"#,
            r#"{"actions": [{"action": 1, "endpoint": "/predict_price"}]}"#,
            r#"{"actions": [{"action": "GET"}]}"#,
            r#"{"actions": [{"action": "GET", "endpoint": "/bto/town_reco", "params": [1]}]}"#,
        ] {
            assert!(
                matches!(parse_plan(content), Err(EngineError::PlanParse(_))),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_unknown_endpoint_survives_parsing() {
        let actions =
            parse_plan(r#"{"actions": [{"action": "DELETE", "endpoint": "/users"}]}"#).unwrap();
        assert_eq!(actions[0].verb, "DELETE");
        assert_eq!(actions[0].target, "/users");
    }
}
