//! SQLite run database
//!
//! Pairs are loaded into a temporary table and joined against the run table,
//! so one query answers the sum no matter how many pairs there are.

use super::traits::{ReferenceDatabase, TriggerLookup};
use crate::config::DatabaseConfig;
use crate::domain::{CatalogueError, Result, RunSubrun};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const PAIRS_TABLE: &str = "catalogue_pairs";

/// Run database backed by an SQLite file, opened read-only per lookup
#[derive(Debug, Clone)]
pub struct SqliteRunDatabase {
    path: PathBuf,
    table: String,
    trigger_column: String,
}

impl SqliteRunDatabase {
    /// Creates a database handle from configuration
    ///
    /// Table and column names are validated by [`DatabaseConfig`] before they
    /// reach any SQL text.
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            path: config.path.clone(),
            table: config.table.clone(),
            trigger_column: config.trigger_column.clone(),
        }
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup_blocking(&self, pairs: &[RunSubrun]) -> Result<TriggerLookup> {
        let mut conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            CatalogueError::Database(format!(
                "Failed to open run database {}: {}",
                self.path.display(),
                e
            ))
        })?;

        conn.execute_batch(&format!(
            "PRAGMA temp_store = MEMORY;
             CREATE TEMP TABLE {PAIRS_TABLE} (run INTEGER, subrun INTEGER);"
        ))?;

        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {PAIRS_TABLE} (run, subrun) VALUES (?1, ?2)"
            ))?;
            for pair in pairs {
                insert.execute(params![pair.run, pair.subrun])?;
            }
        }
        tx.commit()?;

        let table = &self.table;
        let column = &self.trigger_column;

        let total: f64 = conn.query_row(
            &format!(
                "SELECT IFNULL(SUM(r.{column}), 0) FROM {table} r \
                 JOIN {PAIRS_TABLE} p ON r.run = p.run AND r.subrun = p.subrun"
            ),
            [],
            |row| row.get(0),
        )?;

        let mut missing_stmt = conn.prepare(&format!(
            "SELECT p.run, p.subrun FROM {PAIRS_TABLE} p \
             LEFT JOIN {table} r ON r.run = p.run AND r.subrun = p.subrun \
             WHERE r.run IS NULL ORDER BY p.run, p.subrun"
        ))?;
        let missing = missing_stmt
            .query_map([], |row| Ok(RunSubrun::new(row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut by_run_stmt = conn.prepare(&format!(
            "SELECT r.run, IFNULL(SUM(r.{column}), 0) FROM {table} r \
             JOIN {PAIRS_TABLE} p ON r.run = p.run AND r.subrun = p.subrun \
             GROUP BY r.run ORDER BY r.run"
        ))?;
        let by_run = by_run_stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, to_count(row.get::<_, f64>(1)?)))
            })?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        Ok(TriggerLookup {
            total: to_count(total),
            missing,
            by_run,
        })
    }
}

/// Trigger columns may be stored as REAL; counts are whole and non-negative
fn to_count(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

#[async_trait]
impl ReferenceDatabase for SqliteRunDatabase {
    async fn lookup(&self, pairs: &BTreeSet<RunSubrun>) -> Result<TriggerLookup> {
        if pairs.is_empty() {
            return Ok(TriggerLookup::default());
        }

        let db = self.clone();
        let pairs: Vec<RunSubrun> = pairs.iter().copied().collect();
        tokio::task::spawn_blocking(move || db.lookup_blocking(&pairs))
            .await
            .map_err(|e| CatalogueError::Database(format!("Run database task failed: {e}")))?
    }

    fn describe(&self) -> String {
        format!(
            "sqlite:{} ({}.{})",
            self.path.display(),
            self.table,
            self.trigger_column
        )
    }
}
