//! Import driver: source stream to exercise table
//!
//! Records are processed strictly in order: translate, validate, normalize,
//! offer placeholders, submit. Batches are flushed by the upserter.
//! When the stream ends (or the run stops early) the coverage report is
//! always attempted.

use crate::db::report::{coverage_report, CoverageReport};
use crate::error::{BatchFlushError, ImportError, ImportResult};
use crate::models::ExerciseRecord;
use crate::services::batch_upserter::{BatchUpserter, FlushReport};
use crate::services::category_resolver::CategoryResolver;
use crate::services::normalizer::{normalize, validate};
use crate::services::placeholder_policy::PlaceholderPolicy;
use crate::services::translator::Translator;
use fittrack_common::config::{BatchFailurePolicy, FallbackLabels, ImportSettings};
use futures::{Stream, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// Driver options
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub on_batch_failure: BatchFailurePolicy,
    /// Rows shown in the report sample
    pub sample_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_settings(&ImportSettings::default())
    }
}

impl ImportOptions {
    pub fn from_settings(settings: &ImportSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            on_batch_failure: settings.on_batch_failure,
            sample_size: 5,
        }
    }
}

/// Batch that was rolled back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedBatch {
    pub batch: usize,
    pub first_index: usize,
    pub last_index: usize,
    pub rows: usize,
    pub reason: String,
}

impl From<&BatchFlushError> for FailedBatch {
    fn from(err: &BatchFlushError) -> Self {
        FailedBatch {
            batch: err.batch,
            first_index: err.first_index,
            last_index: err.last_index,
            rows: err.rows.len(),
            reason: err.source.to_string(),
        }
    }
}

/// Counts for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// Records taken from the source
    pub received: usize,
    /// Records normalized and submitted to the upserter
    pub processed: usize,
    /// Records rejected by validation
    pub skipped: usize,
    /// Rows committed (after within-batch collapse)
    pub written: usize,
    /// Submitted records superseded within their batch
    pub collapsed: usize,
    /// Submitted records lost to rolled-back batches
    pub failed: usize,
    /// Records offered a placeholder image
    pub placeholders: usize,
    pub categories_created: usize,
    pub flush_sizes: Vec<usize>,
    pub failed_batches: Vec<FailedBatch>,
    pub report: Option<CoverageReport>,
}

/// Summary plus the error that stopped the run, if any
#[derive(Debug)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub error: Option<ImportError>,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> ImportResult<ImportSummary> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.summary),
        }
    }
}

pub struct ImportDriver {
    pool: SqlitePool,
    resolver: CategoryResolver,
    upserter: BatchUpserter,
    options: ImportOptions,
    translator: Option<Translator>,
    placeholders: Option<PlaceholderPolicy>,
    summary: ImportSummary,
}

impl ImportDriver {
    /// Build a driver; loads the category cache
    pub async fn new(
        pool: SqlitePool,
        fallbacks: FallbackLabels,
        options: ImportOptions,
    ) -> ImportResult<Self> {
        let resolver = CategoryResolver::load(pool.clone(), fallbacks).await?;
        let upserter = BatchUpserter::new(pool.clone(), options.batch_size);

        Ok(Self {
            pool,
            resolver,
            upserter,
            options,
            translator: None,
            placeholders: None,
            summary: ImportSummary::default(),
        })
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_placeholders(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholders = Some(policy);
        self
    }

    /// Consume the source to the end (or the first fatal error)
    pub async fn run<S>(mut self, source: S) -> ImportOutcome
    where
        S: Stream<Item = ImportResult<ExerciseRecord>>,
    {
        let mut source = std::pin::pin!(source);
        let mut index = 0usize;
        let mut fatal: Option<ImportError> = None;

        info!(
            batch_size = self.upserter.batch_size(),
            policy = ?self.options.on_batch_failure,
            "Import started"
        );

        while let Some(item) = source.next().await {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    error!(error = %e, "Source failed, stopping import");
                    fatal = Some(e);
                    break;
                }
            };

            let source_index = index;
            index += 1;
            self.summary.received += 1;

            match self.process(source_index, record).await {
                Ok(()) => {}
                Err(ImportError::Validation { index, message }) => {
                    warn!(index, %message, "Skipping record");
                    self.summary.skipped += 1;
                }
                Err(ImportError::BatchFlush(failed)) => {
                    if let Some(err) = self.batch_failed(*failed) {
                        fatal = Some(err);
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Import stopped");
                    fatal = Some(e);
                    break;
                }
            }
        }

        // Buffered rows are still written unless a batch failure aborted the run
        if !matches!(fatal, Some(ImportError::BatchFlush(_))) {
            match self.upserter.finish().await {
                Ok(Some(report)) => self.batch_committed(&report),
                Ok(None) => {}
                Err(ImportError::BatchFlush(failed)) => {
                    if let Some(err) = self.batch_failed(*failed) {
                        fatal.get_or_insert(err);
                    }
                }
                Err(e) => {
                    fatal.get_or_insert(e);
                }
            }
        }

        self.summary.categories_created = self.resolver.created_count();
        self.summary.flush_sizes = self.upserter.flush_sizes().to_vec();

        match coverage_report(&self.pool, self.options.sample_size).await {
            Ok(report) => self.summary.report = Some(report),
            Err(e) => warn!(error = %e, "Coverage report failed"),
        }

        info!(
            received = self.summary.received,
            processed = self.summary.processed,
            skipped = self.summary.skipped,
            written = self.summary.written,
            failed = self.summary.failed,
            batches = self.summary.flush_sizes.len(),
            "Import finished"
        );

        ImportOutcome {
            summary: self.summary,
            error: fatal,
        }
    }

    async fn process(&mut self, source_index: usize, record: ExerciseRecord) -> ImportResult<()> {
        let record = match &self.translator {
            Some(translator) => translator.apply(record),
            None => record,
        };
        // A translation may blank the name
        validate(source_index, &record)?;

        let mut row = normalize(record, &mut self.resolver).await?;
        if let Some(policy) = &self.placeholders {
            if policy.apply(&mut row) {
                self.summary.placeholders += 1;
            }
        }
        self.summary.processed += 1;

        if let Some(report) = self.upserter.submit(source_index, row).await? {
            self.batch_committed(&report);
        }
        Ok(())
    }

    fn batch_committed(&mut self, report: &FlushReport) {
        self.summary.written += report.written;
        self.summary.collapsed += report.collapsed();
    }

    /// Record a rolled-back batch; returns the error when the run must stop
    fn batch_failed(&mut self, failed: BatchFlushError) -> Option<ImportError> {
        self.summary.failed += failed.rows.len();
        self.summary.failed_batches.push(FailedBatch::from(&failed));

        match self.options.on_batch_failure {
            BatchFailurePolicy::Skip => {
                warn!(
                    batch = failed.batch,
                    first_index = failed.first_index,
                    last_index = failed.last_index,
                    error = %failed.source,
                    "Batch rolled back, continuing"
                );
                None
            }
            BatchFailurePolicy::Abort => {
                error!(
                    batch = failed.batch,
                    error = %failed.source,
                    "Batch rolled back, aborting import"
                );
                Some(failed.into())
            }
        }
    }
}
