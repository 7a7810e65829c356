//! Shared test utilities

#![allow(dead_code)]

use fittrack_common::config::FallbackLabels;
use fittrack_common::db::{init_database, init_memory_database};
use fittrack_import::models::ExerciseRecord;
use fittrack_import::workflow::{ImportDriver, ImportOptions, ImportOutcome};
use fittrack_import::ImportResult;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Fresh in-memory store with seeded reference rows
pub async fn memory_store() -> SqlitePool {
    init_memory_database(&FallbackLabels::default())
        .await
        .expect("in-memory database")
}

/// On-disk store in a temp dir; keep the TempDir alive for the test
pub async fn file_store() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("temp dir");
    let pool = init_database(&dir.path().join("fittrack.db"), &FallbackLabels::default())
        .await
        .expect("file database");
    (dir, pool)
}

/// Run the driver over an in-memory list of records
pub async fn import(
    pool: &SqlitePool,
    options: ImportOptions,
    records: Vec<ExerciseRecord>,
) -> ImportOutcome {
    let driver = ImportDriver::new(pool.clone(), FallbackLabels::default(), options)
        .await
        .expect("driver");
    let items: Vec<ImportResult<ExerciseRecord>> = records.into_iter().map(Ok).collect();
    driver.run(futures::stream::iter(items)).await
}

pub fn options(batch_size: usize) -> ImportOptions {
    ImportOptions {
        batch_size,
        ..Default::default()
    }
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count")
}

pub async fn category_id(pool: &SqlitePool, table: &str, name: &str) -> Option<i64> {
    sqlx::query_scalar(&format!("SELECT id FROM {} WHERE name = ?", table))
        .bind(name)
        .fetch_optional(pool)
        .await
        .expect("category lookup")
}
