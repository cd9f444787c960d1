//! Shared fixtures for the integration tests

#![allow(dead_code)]

use resale_engine::db::{Database, LaunchRecord, ResaleTransaction};
use sdk::types::HousingUnitDescriptor;
use std::path::Path;

pub const TOWNS: [&str; 3] = ["ANG MO KIO", "BEDOK", "TAMPINES"];
pub const FLAT_TYPES: [&str; 2] = ["3 ROOM", "4 ROOM"];
pub const STOREY_RANGES: [&str; 2] = ["01 TO 03", "04 TO 06"];
pub const FLAT_MODELS: [&str; 2] = ["Improved", "Model A"];

pub fn descriptor(
    town: &str,
    flat_type: &str,
    storey_range: &str,
    floor_area_sqm: f64,
    flat_model: &str,
    remaining_lease_years: f64,
) -> HousingUnitDescriptor {
    HousingUnitDescriptor {
        region: town.to_string(),
        unit_type: flat_type.to_string(),
        storey_range: storey_range.to_string(),
        floor_area_sqm,
        unit_model: flat_model.to_string(),
        remaining_lease_years,
    }
}

/// The flat used in the documented example request
pub fn reference_flat() -> HousingUnitDescriptor {
    descriptor("ANG MO KIO", "4 ROOM", "04 TO 06", 100.0, "Model A", 85.0)
}

/// Noise-free prices from an additive model, so every fitted price is positive
pub fn synthetic_price(d: &HousingUnitDescriptor) -> f64 {
    let town = TOWNS.iter().position(|t| *t == d.region).unwrap_or(0) as f64;
    let flat_type = FLAT_TYPES.iter().position(|t| *t == d.unit_type).unwrap_or(0) as f64;
    let storey = STOREY_RANGES
        .iter()
        .position(|s| *s == d.storey_range)
        .unwrap_or(0) as f64;
    let flat_model = FLAT_MODELS
        .iter()
        .position(|m| *m == d.unit_model)
        .unwrap_or(0) as f64;

    150_000.0
        + 40_000.0 * town
        + 60_000.0 * flat_type
        + 15_000.0 * storey
        + 10_000.0 * flat_model
        + 2_500.0 * d.floor_area_sqm
        + 1_200.0 * d.remaining_lease_years
}

/// One transaction for every category combination, at a few sizes and leases
pub fn synthetic_transactions() -> Vec<ResaleTransaction> {
    let mut rows = Vec::new();
    for town in TOWNS {
        for flat_type in FLAT_TYPES {
            for storey in STOREY_RANGES {
                for flat_model in FLAT_MODELS {
                    for (area, lease) in [(67.0, 60.0), (92.0, 75.0), (110.0, 90.0)] {
                        let d = descriptor(town, flat_type, storey, area, flat_model, lease);
                        rows.push(ResaleTransaction {
                            month: Some("2023-06".to_string()),
                            price: synthetic_price(&d),
                            descriptor: d,
                        });
                    }
                }
            }
        }
    }
    rows
}

/// Open a fresh store under `dir` seeded with the synthetic transactions
pub async fn seeded_store(dir: &Path) -> Database {
    let db = Database::new(&dir.join("hdb_data.db")).await.unwrap();
    let transactions = db.transactions();
    for row in synthetic_transactions() {
        transactions.insert(&row).await.unwrap();
    }
    db
}

/// Insert `count` launches for `region` completed in `year`
pub async fn add_launches(db: &Database, region: &str, year: i32, count: usize) {
    let launches = db.launches();
    for _ in 0..count {
        launches.insert(&LaunchRecord::new(region, year)).await.unwrap();
    }
}
