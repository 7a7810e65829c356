//! Keyword-based placeholder images
//!
//! Rules are tried in order; the first rule with a keyword contained in the
//! lower-cased exercise name wins. The default applies when no rule matches.
//! Placeholders fill `image_url` and `thumbnail_url` only where both the
//! incoming row and the stored exercise have no image.

use crate::error::ImportResult;
use crate::models::ExerciseRow;
use serde::Deserialize;
use std::path::Path;

const BUILTIN_PLACEHOLDERS: &str = include_str!("../../data/placeholders.json");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceholderRule {
    #[serde(default)]
    pub label: Option<String>,
    pub keywords: Vec<String>,
    pub image_url: String,
}

impl PlaceholderRule {
    fn matches(&self, lowered_name: &str) -> bool {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && lowered_name.contains(&k))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlaceholderPolicy {
    #[serde(default)]
    pub rules: Vec<PlaceholderRule>,
    #[serde(default)]
    pub default_image_url: Option<String>,
}

impl PlaceholderPolicy {
    pub fn builtin() -> ImportResult<Self> {
        Self::from_json(BUILTIN_PLACEHOLDERS)
    }

    pub fn load(path: &Path) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ImportResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Placeholder image for an exercise name
    pub fn classify(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.image_url.as_str())
            .or(self.default_image_url.as_deref())
    }

    /// Offer a placeholder for a row that carries no image.
    ///
    /// The upsert writes it only where the store has no image either, so a
    /// previously imported image is never replaced. Returns true when a
    /// placeholder was attached.
    pub fn apply(&self, row: &mut ExerciseRow) -> bool {
        if row.image_url.is_some() {
            return false;
        }
        row.placeholder_image = self.classify(&row.name).map(str::to_string);
        row.placeholder_image.is_some()
    }
}
