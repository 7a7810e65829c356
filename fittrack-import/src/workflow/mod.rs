//! Import workflows
//!
//! - `driver`: source stream through resolver, normalizer and upserter
//! - `enrichment`: detail backfill for exercises with an upstream id
//! - `media_backfill`: static media table plus placeholder images

pub mod driver;
pub mod enrichment;
pub mod media_backfill;

pub use driver::{FailedBatch, ImportDriver, ImportOptions, ImportOutcome, ImportSummary};
pub use enrichment::{enrich_exercises, DetailSource, EnrichmentStats};
pub use media_backfill::{backfill_media, MediaBackfillStats, MediaEntry, MediaTable};
