//! Detail enrichment
//!
//! Exercises that carry an upstream id but miss a description or media get
//! the detail record fetched and merged in. Updates are committed every
//! `batch_size` exercises; a failed fetch is logged and counted.

use crate::db::exercises::{self, EnrichmentCandidate};
use crate::error::ImportResult;
use crate::models::ExerciseDetail;
use crate::services::normalizer::format_instructions;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Source of per-exercise detail records
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// `Ok(None)` when the id is unknown to the source
    async fn fetch_detail(&self, external_id: &str) -> ImportResult<Option<ExerciseDetail>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub candidates: usize,
    pub updated: usize,
    /// Unknown upstream or detail without usable fields
    pub missing: usize,
    pub failed: usize,
}

pub async fn enrich_exercises<D>(
    pool: &SqlitePool,
    source: &D,
    batch_size: usize,
    limit: Option<usize>,
) -> ImportResult<EnrichmentStats>
where
    D: DetailSource + ?Sized,
{
    let batch_size = batch_size.max(1);
    let candidates = exercises::enrichment_candidates(pool, limit).await?;
    let mut stats = EnrichmentStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    info!(candidates = candidates.len(), "Enriching exercises");

    let mut pending: Vec<(EnrichmentCandidate, ExerciseDetail)> = Vec::with_capacity(batch_size);

    for candidate in candidates {
        match source.fetch_detail(&candidate.external_id).await {
            Ok(Some(detail)) if !detail.is_empty() => {
                debug!(name = %candidate.name, "Detail fetched");
                pending.push((candidate, detail));
            }
            Ok(_) => {
                debug!(name = %candidate.name, external_id = %candidate.external_id, "No detail");
                stats.missing += 1;
            }
            Err(e) => {
                warn!(name = %candidate.name, error = %e, "Detail fetch failed");
                stats.failed += 1;
            }
        }

        if pending.len() >= batch_size {
            stats.updated += write_details(pool, &pending).await?;
            pending.clear();
        }
    }

    if !pending.is_empty() {
        stats.updated += write_details(pool, &pending).await?;
    }

    info!(
        updated = stats.updated,
        missing = stats.missing,
        failed = stats.failed,
        "Enrichment finished"
    );
    Ok(stats)
}

async fn write_details(
    pool: &SqlitePool,
    pending: &[(EnrichmentCandidate, ExerciseDetail)],
) -> ImportResult<usize> {
    let mut tx = pool.begin().await?;
    let mut updated = 0;

    for (candidate, detail) in pending {
        let instructions = format_instructions(&detail.instructions);
        if exercises::apply_detail(&mut tx, candidate.id, detail, instructions.as_deref()).await? {
            updated += 1;
        }
    }

    tx.commit().await?;
    info!(rows = updated, "Committed detail updates");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::exercises::{load_exercise, upsert_exercises_atomic};
    use crate::error::ImportError;
    use crate::models::{ExerciseRow, ResolvedCategory};
    use fittrack_common::config::FallbackLabels;
    use fittrack_common::db::init_memory_database;
    use std::collections::HashMap;

    struct FakeDetails(HashMap<String, ExerciseDetail>);

    #[async_trait]
    impl DetailSource for FakeDetails {
        async fn fetch_detail(&self, external_id: &str) -> ImportResult<Option<ExerciseDetail>> {
            if external_id == "boom" {
                return Err(ImportError::SourceFetch {
                    page: None,
                    message: "HTTP 500".to_string(),
                });
            }
            Ok(self.0.get(external_id).cloned())
        }
    }

    fn row(name: &str, external_id: &str) -> ExerciseRow {
        ExerciseRow {
            name: name.to_string(),
            description: None,
            instructions: None,
            primary_muscle_group: ResolvedCategory::explicit(1),
            equipment: ResolvedCategory::explicit(1),
            difficulty: ResolvedCategory::explicit(1),
            image_url: Some("https://img/kept.png".to_string()),
            animation_url: None,
            video_url: None,
            thumbnail_url: None,
            external_id: Some(external_id.to_string()),
            original_name: None,
            placeholder_image: None,
        }
    }

    #[tokio::test]
    async fn test_enrichment_merges_and_counts() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        let plank = row("Plank", "P1");
        let squat = row("Squat", "S1");
        let broken = row("Broken", "boom");
        upsert_exercises_atomic(&pool, &[&plank, &squat, &broken])
            .await
            .unwrap();

        let mut details = HashMap::new();
        details.insert(
            "P1".to_string(),
            ExerciseDetail {
                description: Some("Hold a straight line".to_string()),
                instructions: vec!["Brace".to_string(), "Breathe".to_string()],
                video_url: Some("https://vid/plank.mp4".to_string()),
                ..Default::default()
            },
        );

        let stats = enrich_exercises(&pool, &FakeDetails(details), 1, None)
            .await
            .unwrap();
        assert_eq!(
            stats,
            EnrichmentStats {
                candidates: 3,
                updated: 1,
                missing: 1,
                failed: 1
            }
        );

        let stored = load_exercise(&pool, "Plank").await.unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("Hold a straight line"));
        assert_eq!(stored.instructions.as_deref(), Some("1. Brace\n2. Breathe"));
        assert_eq!(stored.video_url.as_deref(), Some("https://vid/plank.mp4"));
        // Detail had no image; the stored one stays
        assert_eq!(stored.image_url.as_deref(), Some("https://img/kept.png"));
    }

    #[tokio::test]
    async fn test_limit_caps_candidates() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        let a = row("A", "1");
        let b = row("B", "2");
        upsert_exercises_atomic(&pool, &[&a, &b]).await.unwrap();

        let stats = enrich_exercises(&pool, &FakeDetails(HashMap::new()), 10, Some(1))
            .await
            .unwrap();
        assert_eq!(stats.candidates, 1);
        assert_eq!(stats.missing, 1);
    }
}
