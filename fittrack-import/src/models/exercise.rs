//! Exercise records as they travel through the importer

use serde::{Deserialize, Serialize};

/// Exercise as delivered by a source (upstream API, seed table, cache file).
///
/// Every field except `name` is optional; a missing value means "unknown",
/// never "clear the stored value".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseRecord {
    /// Natural key of the exercise
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_muscle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Upstream template id, used for detail enrichment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Name before translation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Secondary muscle labels (not persisted)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary_muscles: Vec<String>,
}

impl ExerciseRecord {
    /// Record with only a name set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Category id after resolution
///
/// `explicit` is false when the id came from the fallback for a missing
/// label. Fallback ids are written on insert only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCategory {
    pub id: i64,
    pub explicit: bool,
}

impl ResolvedCategory {
    pub fn explicit(id: i64) -> Self {
        Self { id, explicit: true }
    }

    pub fn fallback(id: i64) -> Self {
        Self {
            id,
            explicit: false,
        }
    }

    /// Value bound for the update branch of an upsert (`None` keeps the stored id)
    pub fn update_value(&self) -> Option<i64> {
        self.explicit.then_some(self.id)
    }
}

/// Canonical destination row, labels replaced by category ids
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRow {
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub primary_muscle_group: ResolvedCategory,
    pub equipment: ResolvedCategory,
    pub difficulty: ResolvedCategory,
    pub image_url: Option<String>,
    pub animation_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub external_id: Option<String>,
    pub original_name: Option<String>,
    /// Policy image; only lands where no image is stored
    pub placeholder_image: Option<String>,
}

/// Richer fields returned by the upstream detail endpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseDetail {
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub animation_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl ExerciseDetail {
    /// True when the detail carries nothing worth writing
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.instructions.iter().all(|s| s.trim().is_empty())
            && self.image_url.is_none()
            && self.animation_url.is_none()
            && self.video_url.is_none()
            && self.thumbnail_url.is_none()
    }
}
