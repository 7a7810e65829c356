//! Buffered, batched upserts into `exercises`
//!
//! Rows are buffered until `batch_size` is reached, then written in one
//! transaction. Inside a batch the last row submitted for a name wins.
//! A failed batch is rolled back and handed back whole; nothing is retried
//! automatically.

use crate::db::exercises;
use crate::error::{BatchFlushError, ImportResult};
use crate::models::ExerciseRow;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};

/// Row waiting in the buffer, tagged with its position in the source
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub source_index: usize,
    pub row: ExerciseRow,
}

/// Result of a committed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub batch: usize,
    pub first_index: usize,
    pub last_index: usize,
    /// Rows submitted to the batch
    pub submitted: usize,
    /// Rows written after collapsing duplicate names
    pub written: usize,
}

impl FlushReport {
    /// Submitted rows superseded by a later row with the same name
    pub fn collapsed(&self) -> usize {
        self.submitted - self.written
    }
}

pub struct BatchUpserter {
    pool: SqlitePool,
    batch_size: usize,
    buffer: Vec<PendingRow>,
    batches: usize,
    flush_sizes: Vec<usize>,
}

impl BatchUpserter {
    pub fn new(pool: SqlitePool, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            pool,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            batches: 0,
            flush_sizes: Vec::new(),
        }
    }

    /// Buffer a row; flushes when the buffer is full
    pub async fn submit(
        &mut self,
        source_index: usize,
        row: ExerciseRow,
    ) -> ImportResult<Option<FlushReport>> {
        self.buffer.push(PendingRow { source_index, row });
        if self.buffer.len() >= self.batch_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Flush whatever is buffered (end of stream)
    pub async fn finish(&mut self) -> ImportResult<Option<FlushReport>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        self.flush().await.map(Some)
    }

    /// Write the buffer as one batch.
    ///
    /// The buffer is emptied whether or not the write succeeds; on failure
    /// its rows travel back in the error.
    pub async fn flush(&mut self) -> ImportResult<FlushReport> {
        let rows = std::mem::take(&mut self.buffer);
        self.write_batch(rows).await
    }

    /// Write a previously failed batch again, as a new batch
    pub async fn retry(&mut self, failed: BatchFlushError) -> ImportResult<FlushReport> {
        self.write_batch(failed.rows).await
    }

    /// Size of every batch attempted so far, in order
    pub fn flush_sizes(&self) -> &[usize] {
        &self.flush_sizes
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn write_batch(&mut self, rows: Vec<PendingRow>) -> ImportResult<FlushReport> {
        self.batches += 1;
        let batch = self.batches;
        self.flush_sizes.push(rows.len());

        let first_index = rows.first().map(|p| p.source_index).unwrap_or_default();
        let last_index = rows.last().map(|p| p.source_index).unwrap_or_default();

        let unique = collapse_by_name(&rows);
        debug!(
            batch,
            submitted = rows.len(),
            unique = unique.len(),
            "Flushing batch"
        );

        let result = exercises::upsert_exercises_atomic(&self.pool, &unique).await;
        drop(unique);

        match result {
            Ok(written) => {
                let report = FlushReport {
                    batch,
                    first_index,
                    last_index,
                    submitted: rows.len(),
                    written,
                };
                info!(
                    batch,
                    first_index,
                    last_index,
                    rows = written,
                    "Batch committed"
                );
                Ok(report)
            }
            Err(source) => Err(BatchFlushError {
                batch,
                first_index,
                last_index,
                rows,
                source,
            }
            .into()),
        }
    }
}

/// Keep the last row for each name, ordered by that row's position
fn collapse_by_name(rows: &[PendingRow]) -> Vec<&ExerciseRow> {
    let mut last_for_name: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    for (pos, pending) in rows.iter().enumerate() {
        last_for_name.insert(pending.row.name.as_str(), pos);
    }

    rows.iter()
        .enumerate()
        .filter(|(pos, pending)| last_for_name.get(pending.row.name.as_str()) == Some(pos))
        .map(|(_, pending)| &pending.row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::exercises::{count_exercises, load_exercise};
    use crate::error::ImportError;
    use crate::models::ResolvedCategory;
    use fittrack_common::config::FallbackLabels;
    use fittrack_common::db::init_memory_database;

    fn row(name: &str) -> ExerciseRow {
        ExerciseRow {
            name: name.to_string(),
            description: None,
            instructions: None,
            primary_muscle_group: ResolvedCategory::explicit(1),
            equipment: ResolvedCategory::explicit(1),
            difficulty: ResolvedCategory::explicit(1),
            image_url: None,
            animation_url: None,
            video_url: None,
            thumbnail_url: None,
            external_id: None,
            original_name: None,
            placeholder_image: None,
        }
    }

    #[test]
    fn test_collapse_keeps_last_per_name() {
        let mut a1 = row("A");
        a1.description = Some("first".to_string());
        let mut a2 = row("A");
        a2.description = Some("second".to_string());

        let rows = vec![
            PendingRow { source_index: 0, row: a1 },
            PendingRow { source_index: 1, row: row("B") },
            PendingRow { source_index: 2, row: a2 },
        ];

        let collapsed = collapse_by_name(&rows);
        let names: Vec<&str> = collapsed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(collapsed[1].description.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_submit_flushes_at_batch_size() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        let mut upserter = BatchUpserter::new(pool.clone(), 2);

        assert!(upserter.submit(0, row("A")).await.unwrap().is_none());
        let report = upserter.submit(1, row("B")).await.unwrap().unwrap();
        assert_eq!(report.batch, 1);
        assert_eq!((report.first_index, report.last_index), (0, 1));

        assert!(upserter.submit(2, row("C")).await.unwrap().is_none());
        assert_eq!(upserter.pending(), 1);
        let report = upserter.finish().await.unwrap().unwrap();
        assert_eq!(report.written, 1);
        assert!(upserter.finish().await.unwrap().is_none());

        assert_eq!(upserter.flush_sizes(), &[2, 1]);
        assert_eq!(count_exercises(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_returns_rows_and_can_be_retried() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        let mut upserter = BatchUpserter::new(pool.clone(), 10);

        let mut bad = row("Bad");
        bad.equipment = ResolvedCategory::explicit(4242);
        upserter.submit(5, row("Good")).await.unwrap();
        upserter.submit(6, bad).await.unwrap();

        let err = upserter.finish().await.unwrap_err();
        let failed = match err {
            ImportError::BatchFlush(failed) => *failed,
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(failed.batch, 1);
        assert_eq!((failed.first_index, failed.last_index), (5, 6));
        assert_eq!(failed.rows.len(), 2);
        assert_eq!(count_exercises(&pool).await.unwrap(), 0);

        // Fix the offending row and retry wholesale
        let mut failed = failed;
        failed.rows[1].row.equipment = ResolvedCategory::explicit(1);
        let report = upserter.retry(failed).await.unwrap();
        assert_eq!(report.batch, 2);
        assert_eq!(report.written, 2);
        assert!(load_exercise(&pool, "Bad").await.unwrap().is_some());
    }
}
