//! Error types for fittrack-import
//!
//! Per-record problems (`Validation`) are handled by the driver and the run
//! continues; batch failures follow the configured policy; everything else
//! stops the run.

use crate::services::batch_upserter::PendingRow;
use fittrack_common::db::CategoryKind;
use thiserror::Error;

/// Importer error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Upstream page or detail request failed
    #[error("Source fetch failed{}: {message}", .page.map(|p| format!(" (page {})", p)).unwrap_or_default())]
    SourceFetch { page: Option<u32>, message: String },

    /// No fallback category available for a missing label
    #[error("Cannot resolve {kind}: {message}")]
    CategoryResolution { kind: CategoryKind, message: String },

    /// A batch failed to commit and was rolled back
    #[error(transparent)]
    BatchFlush(Box<BatchFlushError>),

    /// Record rejected before normalization
    #[error("Record {index} rejected: {message}")]
    Validation { index: usize, message: String },

    /// Database error outside a batch flush
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// fittrack-common error
    #[error("Common error: {0}")]
    Common(#[from] fittrack_common::Error),
}

impl From<BatchFlushError> for ImportError {
    fn from(err: BatchFlushError) -> Self {
        ImportError::BatchFlush(Box::new(err))
    }
}

/// Failed batch, handed back whole so the caller can retry it
#[derive(Debug, Error)]
#[error("Batch {batch} (records {first_index}..={last_index}, {} rows) rolled back: {source}", .rows.len())]
pub struct BatchFlushError {
    /// 1-based flush counter
    pub batch: usize,
    /// Source index of the first row submitted to the batch
    pub first_index: usize,
    /// Source index of the last row submitted to the batch
    pub last_index: usize,
    /// Rows as submitted, before within-batch dedup
    pub rows: Vec<PendingRow>,
    #[source]
    pub source: sqlx::Error,
}

/// Result type for importer operations
pub type ImportResult<T> = Result<T, ImportError>;
