//! Database module for the SQLite reference store
//!
//! The store holds two immutable reference tables populated by an external
//! bulk import: `bto_launches` (historical launch records) and
//! `resale_prices` (historical resale transactions). Nothing on the serving
//! path writes to them, so queries need no transaction spanning calls.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub mod launches;
pub mod transactions;

// Re-export commonly used types
pub use launches::{LaunchRecord, LaunchRepository, UnitCounts};
pub use transactions::{ResaleTransaction, TransactionRepository};

/// Database connection pool
///
/// One pool is shared for the life of the process instead of opening a
/// connection per query; the tables are read-only while serving.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the reference store
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Enable WAL mode so readers never block the import job
    /// 3. Ensure the reference tables exist
    pub async fn new(db_path: &Path) -> Result<Self> {
        info!("Opening reference store at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Ensure the reference tables exist. Idempotent.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../migrations/001_reference_tables.sql"))
            .execute(&self.pool)
            .await
            .context("Failed to execute migration 001_reference_tables.sql")?;

        debug!("Reference tables ready");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool
    pub async fn close(self) {
        self.pool.close().await;
        info!("Database connection closed");
    }

    /// Create a launch record repository
    pub fn launches(&self) -> LaunchRepository {
        LaunchRepository::new(self.pool.clone())
    }

    /// Create a resale transaction repository
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }
}
