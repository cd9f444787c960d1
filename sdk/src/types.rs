//! Pricing and region query types
//!
//! Wire names follow the reference data columns (`town`, `flat_type`,
//! `flat_model`, `remaining_lease`); the domain names (`region`,
//! `unit_type`, `unit_model`, `remaining_lease_years`) are accepted as aliases.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// Longest remaining lease a unit can have, in years
pub const MAX_LEASE_YEARS: f64 = 99.0;

/// Structured attributes describing one housing unit for pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingUnitDescriptor {
    #[serde(rename = "town", alias = "region")]
    pub region: String,

    #[serde(rename = "flat_type", alias = "unit_type")]
    pub unit_type: String,

    pub storey_range: String,

    pub floor_area_sqm: f64,

    #[serde(rename = "flat_model", alias = "unit_model")]
    pub unit_model: String,

    #[serde(rename = "remaining_lease", alias = "remaining_lease_years")]
    pub remaining_lease_years: f64,
}

impl HousingUnitDescriptor {
    /// Check every field is present and in range.
    ///
    /// Categorical values are only checked for emptiness; values outside the
    /// training vocabulary are handled by the encoder, not rejected here.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, value) in [
            ("town", &self.region),
            ("flat_type", &self.unit_type),
            ("storey_range", &self.storey_range),
            ("flat_model", &self.unit_model),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::validation(field, "must not be empty"));
            }
        }

        if !self.floor_area_sqm.is_finite() || self.floor_area_sqm <= 0.0 {
            return Err(EngineError::validation(
                "floor_area_sqm",
                "must be a finite number greater than 0",
            ));
        }

        if !self.remaining_lease_years.is_finite()
            || !(0.0..=MAX_LEASE_YEARS).contains(&self.remaining_lease_years)
        {
            return Err(EngineError::validation(
                "remaining_lease",
                format!("must be between 0 and {}", MAX_LEASE_YEARS),
            ));
        }

        Ok(())
    }
}

/// Validate a discount percentage. `100` reproduces the full price.
pub fn validate_discount(discount: f64) -> Result<(), EngineError> {
    if !discount.is_finite() || discount < 0.0 {
        return Err(EngineError::validation(
            "discount",
            "must be a finite number >= 0",
        ));
    }
    Ok(())
}

/// Raw prediction request as received from a client or a plan step.
///
/// Every field is optional here so that a missing field surfaces as a
/// validation error naming that field rather than a generic decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictPriceRequest {
    #[serde(default, rename = "town", alias = "region")]
    pub region: Option<String>,

    #[serde(default, rename = "flat_type", alias = "unit_type")]
    pub unit_type: Option<String>,

    #[serde(default)]
    pub storey_range: Option<String>,

    #[serde(default)]
    pub floor_area_sqm: Option<f64>,

    #[serde(default, rename = "flat_model", alias = "unit_model")]
    pub unit_model: Option<String>,

    #[serde(default, rename = "remaining_lease", alias = "remaining_lease_years")]
    pub remaining_lease_years: Option<f64>,

    #[serde(default)]
    pub discount: Option<f64>,
}

impl PredictPriceRequest {
    /// Decode a request from arbitrary JSON, mapping type mismatches to
    /// validation errors.
    pub fn from_value(value: serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(value).map_err(|e| EngineError::validation("request", e.to_string()))
    }

    /// Split into a validated descriptor and an optional discount
    pub fn into_parts(self) -> Result<(HousingUnitDescriptor, Option<f64>), EngineError> {
        fn required<T>(field: &str, value: Option<T>) -> Result<T, EngineError> {
            value.ok_or_else(|| EngineError::validation(field, "is required"))
        }

        let descriptor = HousingUnitDescriptor {
            region: required("town", self.region)?,
            unit_type: required("flat_type", self.unit_type)?,
            storey_range: required("storey_range", self.storey_range)?,
            floor_area_sqm: required("floor_area_sqm", self.floor_area_sqm)?,
            unit_model: required("flat_model", self.unit_model)?,
            remaining_lease_years: required("remaining_lease", self.remaining_lease_years)?,
        };
        descriptor.validate()?;

        if let Some(discount) = self.discount {
            validate_discount(discount)?;
        }

        Ok((descriptor, self.discount))
    }
}

impl From<(HousingUnitDescriptor, Option<f64>)> for PredictPriceRequest {
    fn from((descriptor, discount): (HousingUnitDescriptor, Option<f64>)) -> Self {
        Self {
            region: Some(descriptor.region),
            unit_type: Some(descriptor.unit_type),
            storey_range: Some(descriptor.storey_range),
            floor_area_sqm: Some(descriptor.floor_area_sqm),
            unit_model: Some(descriptor.unit_model),
            remaining_lease_years: Some(descriptor.remaining_lease_years),
            discount,
        }
    }
}

/// A computed price estimate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Predicted resale price, rounded to 2 decimal places, never negative
    pub predicted_price: f64,

    /// `predicted_price * discount / 100`, rounded to 2 decimal places
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<f64>,

    /// Version of the artifact that produced the estimate
    pub model_version: String,

    /// Natural-language justification, when one was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Sort direction for region launch counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Highest,
    Lowest,
}

impl Direction {
    pub fn as_str(&self) -> &str {
        match self {
            Direction::Highest => "highest",
            Direction::Lowest => "lowest",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "highest" => Ok(Direction::Highest),
            "lowest" => Ok(Direction::Lowest),
            other => Err(EngineError::validation(
                "direction",
                format!("'{}' is not one of: highest, lowest", other),
            )),
        }
    }
}

/// Number of launches recorded for one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCount {
    pub region: String,
    pub count: i64,
}

/// Result of a top-regions query.
///
/// `NoData` is returned when the time window holds no launch records at all,
/// and serializes as `{"message": "no data"}` so callers can branch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopRegions {
    Regions(Vec<RegionCount>),
    NoData,
}

impl TopRegions {
    pub const NO_DATA_MESSAGE: &'static str = "no data";

    pub fn is_no_data(&self) -> bool {
        matches!(self, TopRegions::NoData)
    }

    /// Region names in result order; empty for `NoData`
    pub fn region_names(&self) -> Vec<&str> {
        match self {
            TopRegions::Regions(regions) => regions.iter().map(|r| r.region.as_str()).collect(),
            TopRegions::NoData => Vec::new(),
        }
    }
}

impl Serialize for TopRegions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct NoData<'a> {
            message: &'a str,
        }

        match self {
            TopRegions::Regions(regions) => regions.serialize(serializer),
            TopRegions::NoData => NoData {
                message: Self::NO_DATA_MESSAGE,
            }
            .serialize(serializer),
        }
    }
}

/// Raw top-regions request. Accepts the original endpoint's parameter names
/// (`type`, `duration`) as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopRegionsRequest {
    #[serde(default, alias = "type")]
    pub direction: Option<String>,

    #[serde(default, alias = "duration")]
    pub window_years: Option<i64>,

    #[serde(default)]
    pub limit: Option<i64>,
}

/// Validated top-regions query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopRegionsQuery {
    pub direction: Direction,
    pub window_years: u32,
    pub limit: u32,
}

impl TopRegionsRequest {
    pub fn from_value(value: serde_json::Value) -> Result<Self, EngineError> {
        serde_json::from_value(value).map_err(|e| EngineError::validation("request", e.to_string()))
    }

    /// Validate, substituting `defaults` for absent fields
    pub fn resolve(self, defaults: TopRegionsQuery) -> Result<TopRegionsQuery, EngineError> {
        let direction = match self.direction {
            Some(d) => d.parse()?,
            None => defaults.direction,
        };

        let window_years = match self.window_years {
            Some(w) => u32::try_from(w)
                .map_err(|_| EngineError::validation("window_years", "must be >= 0"))?,
            None => defaults.window_years,
        };

        let limit = match self.limit {
            Some(l) if l >= 1 => {
                u32::try_from(l).map_err(|_| EngineError::validation("limit", "is too large"))?
            }
            Some(_) => return Err(EngineError::validation("limit", "must be >= 1")),
            None => defaults.limit,
        };

        Ok(TopRegionsQuery {
            direction,
            window_years,
            limit,
        })
    }
}

/// Monitoring counters; coarse, not authoritative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub error_count: u64,
    pub model_version: String,
}
