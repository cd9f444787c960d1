//! Launch record repository
//!
//! Grouped count queries over `bto_launches`. The sort direction is chosen
//! between two static statements; no caller input is ever spliced into SQL.

use anyhow::{Context, Result};
use sdk::types::{Direction, RegionCount};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

const TOP_REGIONS_DESC: &str = r#"
    SELECT bldg_contract_town AS region, COUNT(*) AS launch_count
    FROM bto_launches
    WHERE year_completed >= ? AND bldg_contract_town IS NOT NULL
    GROUP BY bldg_contract_town
    ORDER BY launch_count DESC, region ASC
    LIMIT ?
"#;

const TOP_REGIONS_ASC: &str = r#"
    SELECT bldg_contract_town AS region, COUNT(*) AS launch_count
    FROM bto_launches
    WHERE year_completed >= ? AND bldg_contract_town IS NOT NULL
    GROUP BY bldg_contract_town
    ORDER BY launch_count ASC, region ASC
    LIMIT ?
"#;

/// Units sold per flat type in one launch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCounts {
    pub room_1_sold: i64,
    pub room_2_sold: i64,
    pub room_3_sold: i64,
    pub room_4_sold: i64,
    pub room_5_sold: i64,
    pub exec_sold: i64,
    pub multigen_sold: i64,
    pub studio_apartment_sold: i64,
}

impl UnitCounts {
    pub fn total(&self) -> i64 {
        self.room_1_sold
            + self.room_2_sold
            + self.room_3_sold
            + self.room_4_sold
            + self.room_5_sold
            + self.exec_sold
            + self.multigen_sold
            + self.studio_apartment_sold
    }
}

/// One historical construction project row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub block: String,
    pub street: String,
    pub max_floor_lvl: i64,
    pub year_completed: i32,
    pub region: String,
    pub total_dwelling_units: i64,
    pub units: UnitCounts,
}

impl LaunchRecord {
    /// A record with only region and completion year set
    pub fn new(region: impl Into<String>, year_completed: i32) -> Self {
        Self {
            block: String::new(),
            street: String::new(),
            max_floor_lvl: 0,
            year_completed,
            region: region.into(),
            total_dwelling_units: 0,
            units: UnitCounts::default(),
        }
    }
}

/// Repository for launch record queries
#[derive(Clone)]
pub struct LaunchRepository {
    pool: SqlitePool,
}

impl LaunchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Count launches per region completed in or after `year_cutoff`,
    /// ordered by count in `direction`, ties broken by region name.
    pub async fn top_regions(
        &self,
        direction: Direction,
        year_cutoff: i32,
        limit: u32,
    ) -> Result<Vec<RegionCount>> {
        let sql = match direction {
            Direction::Highest => TOP_REGIONS_DESC,
            Direction::Lowest => TOP_REGIONS_ASC,
        };

        let rows = sqlx::query(sql)
            .bind(year_cutoff)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to query launch counts")?;

        rows.into_iter()
            .map(|row| {
                Ok(RegionCount {
                    region: row.try_get("region")?,
                    count: row.try_get("launch_count")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .context("Failed to decode launch count row")
    }

    /// Total number of launch records
    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bto_launches")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count launch records")
    }

    /// Insert one launch record. Used by seeding and tests; the serving path
    /// never writes.
    pub async fn insert(&self, record: &LaunchRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bto_launches (
                blk_no, street, max_floor_lvl, year_completed, bldg_contract_town,
                total_dwelling_units, room_1_sold, room_2_sold, room_3_sold, room_4_sold,
                room_5_sold, exec_sold, multigen_sold, studio_apartment_sold
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.block)
        .bind(&record.street)
        .bind(record.max_floor_lvl)
        .bind(record.year_completed)
        .bind(&record.region)
        .bind(record.total_dwelling_units)
        .bind(record.units.room_1_sold)
        .bind(record.units.room_2_sold)
        .bind(record.units.room_3_sold)
        .bind(record.units.room_4_sold)
        .bind(record.units.room_5_sold)
        .bind(record.units.exec_sold)
        .bind(record.units.multigen_sold)
        .bind(record.units.studio_apartment_sold)
        .execute(&self.pool)
        .await
        .context("Failed to insert launch record")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    async fn seeded(temp_dir: &TempDir) -> Database {
        let db = Database::new(&temp_dir.path().join("launches.db"))
            .await
            .unwrap();
        let repo = db.launches();
        for (region, year) in [
            ("PUNGGOL", 2018),
            ("PUNGGOL", 2019),
            ("PUNGGOL", 2021),
            ("SENGKANG", 2020),
            ("SENGKANG", 2022),
            ("TENGAH", 2023),
            ("QUEENSTOWN", 1995),
        ] {
            repo.insert(&LaunchRecord::new(region, year)).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_top_regions_highest() {
        let temp_dir = TempDir::new().unwrap();
        let db = seeded(&temp_dir).await;

        let regions = db
            .launches()
            .top_regions(Direction::Highest, 2015, 10)
            .await
            .unwrap();

        let names: Vec<_> = regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(names, vec!["PUNGGOL", "SENGKANG", "TENGAH"]);
        assert_eq!(regions[0].count, 3);
    }

    #[tokio::test]
    async fn test_top_regions_lowest_with_limit() {
        let temp_dir = TempDir::new().unwrap();
        let db = seeded(&temp_dir).await;

        let regions = db
            .launches()
            .top_regions(Direction::Lowest, 2015, 1)
            .await
            .unwrap();

        assert_eq!(
            regions,
            vec![RegionCount {
                region: "TENGAH".to_string(),
                count: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_cutoff_is_inclusive() {
        let temp_dir = TempDir::new().unwrap();
        let db = seeded(&temp_dir).await;

        let regions = db
            .launches()
            .top_regions(Direction::Highest, 2023, 10)
            .await
            .unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region, "TENGAH");

        let regions = db
            .launches()
            .top_regions(Direction::Highest, 2024, 10)
            .await
            .unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_unit_totals() {
        let units = UnitCounts {
            room_3_sold: 40,
            room_4_sold: 60,
            exec_sold: 5,
            ..Default::default()
        };
        assert_eq!(units.total(), 105);
    }
}
