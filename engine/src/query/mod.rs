//! Aggregation query service
//!
//! Read-only grouped counts over the launch records: which regions had the
//! most (or fewest) launches completed within the last N years.

use async_trait::async_trait;
use chrono::Datelike;
use sdk::errors::EngineError;
use sdk::types::{TopRegions, TopRegionsQuery};
use tracing::debug;

use crate::conductor::RegionQuery;
use crate::db::LaunchRepository;

#[derive(Clone)]
pub struct AggregationService {
    launches: LaunchRepository,
    /// Fixed year used instead of the clock, for reproducible queries
    current_year: Option<i32>,
}

impl AggregationService {
    pub fn new(launches: LaunchRepository) -> Self {
        Self {
            launches,
            current_year: None,
        }
    }

    /// Pin the year the window is measured back from
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    fn current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    /// First completion year inside a window of `window_years`
    pub fn year_cutoff(&self, window_years: u32) -> i32 {
        let window = i32::try_from(window_years).unwrap_or(i32::MAX);
        self.current_year().saturating_sub(window)
    }

    /// Regions ordered by launch count, or `NoData` when the window is empty
    pub async fn top_regions(&self, query: TopRegionsQuery) -> Result<TopRegions, EngineError> {
        let cutoff = self.year_cutoff(query.window_years);
        debug!(
            "Top regions: direction={}, cutoff={}, limit={}",
            query.direction, cutoff, query.limit
        );

        let regions = self
            .launches
            .top_regions(query.direction, cutoff, query.limit)
            .await
            .map_err(|e| EngineError::Database(format!("{:#}", e)))?;

        if regions.is_empty() {
            Ok(TopRegions::NoData)
        } else {
            Ok(TopRegions::Regions(regions))
        }
    }
}

#[async_trait]
impl RegionQuery for AggregationService {
    async fn top_regions(&self, query: TopRegionsQuery) -> Result<TopRegions, EngineError> {
        AggregationService::top_regions(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LaunchRecord};
    use sdk::types::Direction;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_window_measured_from_current_year() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("hdb.db")).await.unwrap();
        for (region, year) in [("PUNGGOL", 2015), ("PUNGGOL", 2016), ("TENGAH", 2024)] {
            db.launches()
                .insert(&LaunchRecord::new(region, year))
                .await
                .unwrap();
        }

        let service = AggregationService::new(db.launches()).with_current_year(2025);
        assert_eq!(service.year_cutoff(10), 2015);

        let result = service
            .top_regions(TopRegionsQuery {
                direction: Direction::Highest,
                window_years: 10,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(result.region_names(), vec!["PUNGGOL"]);

        let result = service
            .top_regions(TopRegionsQuery {
                direction: Direction::Highest,
                window_years: 5,
                limit: 5,
            })
            .await
            .unwrap();
        assert_eq!(result.region_names(), vec!["TENGAH"]);
    }

    #[tokio::test]
    async fn test_empty_window_is_no_data() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("hdb.db")).await.unwrap();
        db.launches()
            .insert(&LaunchRecord::new("QUEENSTOWN", 1990))
            .await
            .unwrap();

        let service = AggregationService::new(db.launches()).with_current_year(2025);
        let result = service
            .top_regions(TopRegionsQuery {
                direction: Direction::Highest,
                window_years: 10,
                limit: 1,
            })
            .await
            .unwrap();
        assert!(result.is_no_data());
    }
}
