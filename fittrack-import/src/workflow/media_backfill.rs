//! Media backfill from a static name to media table
//!
//! Listed exercises get their image, animation and thumbnail merged in.
//! Unlisted exercises without an image get a placeholder. One transaction.

use crate::db::exercises;
use crate::error::ImportResult;
use crate::services::placeholder_policy::PlaceholderPolicy;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_MEDIA: &str = include_str!("../../data/media.json");

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaEntry {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub animation: Option<String>,
}

/// Exercise name to media URLs
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MediaTable(HashMap<String, MediaEntry>);

impl MediaTable {
    pub fn builtin() -> ImportResult<Self> {
        Self::from_json(BUILTIN_MEDIA)
    }

    pub fn load(path: &Path) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ImportResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, name: &str) -> Option<&MediaEntry> {
        self.0.get(name.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaBackfillStats {
    /// Exercises found in the media table
    pub matched: usize,
    /// Exercises given a placeholder image
    pub placeholders: usize,
    pub untouched: usize,
}

pub async fn backfill_media(
    pool: &SqlitePool,
    table: &MediaTable,
    policy: &PlaceholderPolicy,
) -> ImportResult<MediaBackfillStats> {
    let rows = exercises::list_media_state(pool).await?;
    let mut stats = MediaBackfillStats::default();

    let mut tx = pool.begin().await?;
    for (id, name, image_url) in rows {
        if let Some(entry) = table.get(&name) {
            let image = entry.image.as_deref().filter(|u| !u.trim().is_empty());
            let animation = entry.animation.as_deref().filter(|u| !u.trim().is_empty());
            exercises::apply_media(&mut tx, id, image, animation).await?;
            debug!(name = %name, "Media applied");
            stats.matched += 1;
            continue;
        }

        let has_image = image_url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let placeholder = if has_image { None } else { policy.classify(&name) };
        let applied = match placeholder {
            Some(url) => exercises::apply_placeholder(&mut tx, id, url).await?,
            None => false,
        };
        if applied {
            debug!(name = %name, "Placeholder applied");
            stats.placeholders += 1;
        } else {
            stats.untouched += 1;
        }
    }
    tx.commit().await?;

    info!(
        matched = stats.matched,
        placeholders = stats.placeholders,
        untouched = stats.untouched,
        "Media backfill finished"
    );
    Ok(stats)
}
