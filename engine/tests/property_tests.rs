mod common;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

use resale_engine::conductor::{ExecutorOptions, PlanExecutor, PricePredictor, RegionQuery};
use resale_engine::model::{
    apply_discount, round_price, select_latest, ModelArtifact, ModelVersion, PriceModel,
    PricePipeline,
};
use sdk::errors::EngineError;
use sdk::plan::{ActionStep, Target};
use sdk::types::{
    Direction, HousingUnitDescriptor, PriceQuote, RegionCount, TopRegions, TopRegionsQuery,
};

fn trained_model() -> PriceModel {
    let rows = common::synthetic_transactions();
    let descriptors: Vec<_> = rows.iter().map(|r| r.descriptor.clone()).collect();
    let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
    let pipeline = PricePipeline::fit(&descriptors, &prices, 1e-6).unwrap();
    let trained_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    PriceModel::new(ModelArtifact::new(pipeline, trained_at, rows.len()).unwrap())
}

fn category(known: &'static [&'static str]) -> impl Strategy<Value = String> {
    prop_oneof![
        3 => proptest::sample::select(known).prop_map(str::to_string),
        1 => "[A-Z][A-Z ]{0,15}",
    ]
}

prop_compose! {
    fn any_descriptor()(
        region in category(&common::TOWNS),
        unit_type in category(&common::FLAT_TYPES),
        storey_range in category(&common::STOREY_RANGES),
        unit_model in category(&common::FLAT_MODELS),
        floor_area_sqm in 1.0..400.0f64,
        remaining_lease_years in 0.0..=99.0f64,
    ) -> HousingUnitDescriptor {
        HousingUnitDescriptor {
            region,
            unit_type,
            storey_range,
            floor_area_sqm,
            unit_model,
            remaining_lease_years,
        }
    }
}

// Predictions are finite, never negative, and carry at most two decimals,
// including for categories the model never saw.
proptest! {
    #[test]
    fn test_prediction_is_finite_and_non_negative(descriptor in any_descriptor()) {
        let model = trained_model();
        let quote = model.quote(&descriptor, None).unwrap();

        prop_assert!(quote.predicted_price.is_finite());
        prop_assert!(quote.predicted_price >= 0.0);
        let cents = quote.predicted_price * 100.0;
        prop_assert!((cents - cents.round()).abs() < 1e-6);
    }
}

// A 100% discount reproduces the predicted price exactly
proptest! {
    #[test]
    fn test_full_discount_is_identity(price in 0.0..5_000_000.0f64) {
        let rounded = (price * 100.0).round() / 100.0;
        prop_assert_eq!(apply_discount(rounded, 100.0), rounded);
    }

    #[test]
    fn test_discount_never_exceeds_price_below_hundred(
        price in 0.0..5_000_000.0f64,
        discount in 0.0..=100.0f64,
    ) {
        let rounded = (price * 100.0).round() / 100.0;
        prop_assert!(apply_discount(rounded, discount) <= rounded + 0.005);
    }
}

// The discounted price is the rounded percentage of the predicted price,
// including discounts above 100.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_quote_discount_matches_formula(
        descriptor in any_descriptor(),
        discount in 0.0..1000.0f64,
    ) {
        let model = trained_model();
        let quote = model.quote(&descriptor, Some(discount)).unwrap();

        prop_assert_eq!(
            quote.discounted_price,
            Some(round_price(quote.predicted_price * discount / 100.0))
        );
    }
}

fn version_token() -> impl Strategy<Value = ModelVersion> {
    prop_oneof!["[0-9]{1,14}", "[0-9A-Za-z_-]{1,14}"].prop_map(ModelVersion::new)
}

// Version ordering is a total order, so the newest artifact does not depend
// on directory listing order.
proptest! {
    #[test]
    fn test_version_ordering_is_transitive(
        a in version_token(),
        b in version_token(),
        c in version_token(),
    ) {
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn test_select_latest_independent_of_order(
        mut tokens in proptest::collection::vec(version_token(), 1..10),
    ) {
        let forward = select_latest(tokens.clone()).unwrap();
        tokens.reverse();
        let backward = select_latest(tokens.clone()).unwrap();
        prop_assert_eq!(forward.cmp(&backward), std::cmp::Ordering::Equal);
        prop_assert!(tokens.iter().all(|t| t <= &forward));
    }
}

struct EchoRegions;

#[async_trait]
impl RegionQuery for EchoRegions {
    async fn top_regions(&self, query: TopRegionsQuery) -> Result<TopRegions, EngineError> {
        Ok(TopRegions::Regions(vec![RegionCount {
            region: query.direction.to_string(),
            count: i64::from(query.limit),
        }]))
    }
}

struct EchoPrices;

#[async_trait]
impl PricePredictor for EchoPrices {
    async fn predict(
        &self,
        descriptor: &HousingUnitDescriptor,
        discount: Option<f64>,
    ) -> Result<PriceQuote, EngineError> {
        Ok(PriceQuote {
            predicted_price: descriptor.floor_area_sqm,
            discounted_price: discount,
            model_version: descriptor.region.clone(),
            explanation: None,
        })
    }
}

fn any_step() -> impl Strategy<Value = ActionStep> {
    prop_oneof![
        (1..20i64).prop_map(|limit| ActionStep::new(Target::TopRegions)
            .with_param("limit", json!(limit))),
        (-5..0i64).prop_map(|limit| ActionStep::new(Target::TopRegions)
            .with_param("limit", json!(limit))),
        (1.0..200.0f64).prop_map(|area| ActionStep::new(Target::PredictPrice)
            .with_param("town", json!("BEDOK"))
            .with_param("flat_type", json!("4 ROOM"))
            .with_param("storey_range", json!("01 TO 03"))
            .with_param("floor_area_sqm", json!(area))
            .with_param("flat_model", json!("Improved"))
            .with_param("remaining_lease", json!(70))),
        Just(ActionStep::new(Target::PredictPrice)),
        "[a-z/_]{1,12}".prop_map(|endpoint| ActionStep {
            verb: "GET".to_string(),
            target: endpoint,
            params: Default::default(),
        }),
    ]
}

// One result per action, in plan order, whatever mix of steps succeeds
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_execution_preserves_length_and_order(
        actions in proptest::collection::vec(any_step(), 0..12),
        parallel in any::<bool>(),
    ) {
        let defaults = TopRegionsQuery {
            direction: Direction::Highest,
            window_years: 10,
            limit: 1,
        };
        let executor = PlanExecutor::new(Arc::new(EchoRegions), Arc::new(EchoPrices), defaults)
            .with_options(ExecutorOptions {
                parallel,
                step_timeout: None,
            });

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(executor.execute(&actions));

        prop_assert_eq!(result.len(), actions.len());
        for (action, record) in actions.iter().zip(result.iter()) {
            prop_assert_eq!(action, &record.action);
        }
    }
}
