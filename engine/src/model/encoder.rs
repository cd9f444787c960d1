//! One-hot feature encoder
//!
//! Layout of an encoded row: one indicator block per categorical column
//! (region, unit type, storey range, unit model, in that order), then floor
//! area and remaining lease unscaled. A value outside a column's vocabulary
//! leaves that block all zero.

use sdk::types::HousingUnitDescriptor;
use serde::{Deserialize, Serialize};

/// Categorical column names, in encoding order
pub const CATEGORICAL_COLUMNS: [&str; 4] = ["town", "flat_type", "storey_range", "flat_model"];

/// Numeric column names, in encoding order
pub const NUMERIC_COLUMNS: [&str; 2] = ["floor_area_sqm", "remaining_lease"];

/// Sorted, de-duplicated values seen for one categorical column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    values: Vec<String>,
}

impl Vocabulary {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut values: Vec<String> = values.into_iter().map(str::to_string).collect();
        values.sort();
        values.dedup();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.binary_search_by(|v| v.as_str().cmp(value)).ok()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Encoder fitted once at training time and frozen into the artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    region: Vocabulary,
    unit_type: Vocabulary,
    storey_range: Vocabulary,
    unit_model: Vocabulary,
}

impl FeatureEncoder {
    /// Learn the vocabularies from training descriptors
    pub fn fit<'a, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'a HousingUnitDescriptor> + Clone,
    {
        Self {
            region: Vocabulary::fit(descriptors.clone().into_iter().map(|d| d.region.as_str())),
            unit_type: Vocabulary::fit(
                descriptors
                    .clone()
                    .into_iter()
                    .map(|d| d.unit_type.as_str()),
            ),
            storey_range: Vocabulary::fit(
                descriptors
                    .clone()
                    .into_iter()
                    .map(|d| d.storey_range.as_str()),
            ),
            unit_model: Vocabulary::fit(descriptors.into_iter().map(|d| d.unit_model.as_str())),
        }
    }

    fn blocks(&self) -> [&Vocabulary; 4] {
        [
            &self.region,
            &self.unit_type,
            &self.storey_range,
            &self.unit_model,
        ]
    }

    /// Length of an encoded row
    pub fn width(&self) -> usize {
        self.blocks().iter().map(|v| v.len()).sum::<usize>() + NUMERIC_COLUMNS.len()
    }

    /// Vocabulary of one categorical column, by position in `CATEGORICAL_COLUMNS`
    pub fn vocabulary(&self, column: usize) -> Option<&Vocabulary> {
        self.blocks().get(column).copied()
    }

    /// Encode one descriptor. Never fails; unseen categories encode as zeros.
    pub fn encode(&self, descriptor: &HousingUnitDescriptor) -> Vec<f64> {
        let mut row = vec![0.0; self.width()];
        let values = [
            descriptor.region.as_str(),
            descriptor.unit_type.as_str(),
            descriptor.storey_range.as_str(),
            descriptor.unit_model.as_str(),
        ];

        let mut offset = 0;
        for (vocabulary, value) in self.blocks().into_iter().zip(values) {
            if let Some(index) = vocabulary.index_of(value) {
                row[offset + index] = 1.0;
            }
            offset += vocabulary.len();
        }

        row[offset] = descriptor.floor_area_sqm;
        row[offset + 1] = descriptor.remaining_lease_years;
        row
    }

    /// `column=value` name of every encoded feature, in row order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for (column, vocabulary) in CATEGORICAL_COLUMNS.iter().zip(self.blocks()) {
            names.extend(
                vocabulary
                    .values()
                    .iter()
                    .map(|value| format!("{}={}", column, value)),
            );
        }
        names.extend(NUMERIC_COLUMNS.iter().map(|c| c.to_string()));
        names
    }

    /// Whether every categorical value of `descriptor` was seen in training
    pub fn is_known(&self, descriptor: &HousingUnitDescriptor) -> bool {
        self.region.index_of(&descriptor.region).is_some()
            && self.unit_type.index_of(&descriptor.unit_type).is_some()
            && self.storey_range.index_of(&descriptor.storey_range).is_some()
            && self.unit_model.index_of(&descriptor.unit_model).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(region: &str, unit_type: &str, area: f64) -> HousingUnitDescriptor {
        HousingUnitDescriptor {
            region: region.to_string(),
            unit_type: unit_type.to_string(),
            storey_range: "01 TO 03".to_string(),
            floor_area_sqm: area,
            unit_model: "Improved".to_string(),
            remaining_lease_years: 60.0,
        }
    }

    #[test]
    fn test_vocabulary_sorted_and_deduplicated() {
        let vocab = Vocabulary::fit(["BEDOK", "ANG MO KIO", "BEDOK"]);
        assert_eq!(vocab.values(), &["ANG MO KIO".to_string(), "BEDOK".to_string()]);
        assert_eq!(vocab.index_of("BEDOK"), Some(1));
        assert_eq!(vocab.index_of("YISHUN"), None);
    }

    #[test]
    fn test_encode_layout() {
        let training = vec![
            unit("BEDOK", "3 ROOM", 67.0),
            unit("ANG MO KIO", "4 ROOM", 92.0),
        ];
        let encoder = FeatureEncoder::fit(&training);

        // 2 regions + 2 types + 1 storey + 1 model + 2 numerics
        assert_eq!(encoder.width(), 8);

        let row = encoder.encode(&training[0]);
        assert_eq!(row, vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 67.0, 60.0]);

        let names = encoder.feature_names();
        assert_eq!(names[0], "town=ANG MO KIO");
        assert_eq!(names[2], "flat_type=3 ROOM");
        assert_eq!(names[7], "remaining_lease");
    }

    #[test]
    fn test_unseen_values_encode_as_zero_block() {
        let training = vec![unit("BEDOK", "3 ROOM", 67.0)];
        let encoder = FeatureEncoder::fit(&training);

        let unseen = unit("PUNGGOL", "EXECUTIVE", 120.0);
        assert!(!encoder.is_known(&unseen));

        let row = encoder.encode(&unseen);
        assert_eq!(row[0], 0.0);
        assert_eq!(row[1], 0.0);
        assert_eq!(&row[4..], &[120.0, 60.0]);
    }
}
