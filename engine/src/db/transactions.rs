//! Resale transaction repository
//!
//! Training data only; nothing here is on the request path.

use anyhow::{Context, Result};
use sdk::types::HousingUnitDescriptor;
use sqlx::{Row, SqlitePool};

/// One historical sale
#[derive(Debug, Clone, PartialEq)]
pub struct ResaleTransaction {
    pub month: Option<String>,
    pub descriptor: HousingUnitDescriptor,
    pub price: f64,
}

/// Repository for resale transactions
#[derive(Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every complete transaction row.
    ///
    /// Rows with a NULL in any model column are skipped rather than guessed.
    /// Numeric columns are cast to REAL because the import job may have
    /// written them with either affinity.
    pub async fn load_all(&self) -> Result<Vec<ResaleTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT month, town, flat_type, storey_range,
                   CAST(floor_area_sqm AS REAL) AS floor_area_sqm,
                   flat_model,
                   CAST(remaining_lease AS REAL) AS remaining_lease,
                   CAST(resale_price AS REAL) AS resale_price
            FROM resale_prices
            WHERE town IS NOT NULL
              AND flat_type IS NOT NULL
              AND storey_range IS NOT NULL
              AND floor_area_sqm IS NOT NULL
              AND flat_model IS NOT NULL
              AND remaining_lease IS NOT NULL
              AND resale_price IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to load resale transactions")?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            transactions.push(ResaleTransaction {
                month: row.try_get("month")?,
                descriptor: HousingUnitDescriptor {
                    region: row.try_get("town")?,
                    unit_type: row.try_get("flat_type")?,
                    storey_range: row.try_get("storey_range")?,
                    floor_area_sqm: row.try_get("floor_area_sqm")?,
                    unit_model: row.try_get("flat_model")?,
                    remaining_lease_years: row.try_get("remaining_lease")?,
                },
                price: row.try_get("resale_price")?,
            });
        }

        Ok(transactions)
    }

    /// Total number of transaction rows
    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM resale_prices")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count resale transactions")
    }

    /// Insert one transaction. Used by seeding and tests.
    pub async fn insert(&self, transaction: &ResaleTransaction) -> Result<()> {
        let d = &transaction.descriptor;
        sqlx::query(
            r#"
            INSERT INTO resale_prices (
                month, town, flat_type, storey_range, floor_area_sqm,
                flat_model, remaining_lease, resale_price
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.month)
        .bind(&d.region)
        .bind(&d.unit_type)
        .bind(&d.storey_range)
        .bind(d.floor_area_sqm)
        .bind(&d.unit_model)
        .bind(d.remaining_lease_years)
        .bind(transaction.price)
        .execute(&self.pool)
        .await
        .context("Failed to insert resale transaction")?;

        Ok(())
    }
}
