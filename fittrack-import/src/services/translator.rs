//! Label translation from dictionary tables
//!
//! Lookups are case-insensitive; unknown text passes through unchanged.

use crate::error::ImportResult;
use crate::models::ExerciseRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_TRANSLATIONS: &str = include_str!("../../data/translations_pt.json");

#[derive(Debug, Default, Deserialize)]
struct TranslationFile {
    #[serde(default)]
    exercises: HashMap<String, String>,
    #[serde(default)]
    muscles: HashMap<String, String>,
    #[serde(default)]
    equipment: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Translator {
    exercises: HashMap<String, String>,
    muscles: HashMap<String, String>,
    equipment: HashMap<String, String>,
}

impl Translator {
    /// Bundled English to Portuguese tables
    pub fn builtin() -> ImportResult<Self> {
        Self::from_json(BUILTIN_TRANSLATIONS)
    }

    /// Tables from a JSON file
    pub fn load(path: &Path) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ImportResult<Self> {
        let file: TranslationFile = serde_json::from_str(json)?;
        Ok(Self {
            exercises: lowercase_keys(file.exercises),
            muscles: lowercase_keys(file.muscles),
            equipment: lowercase_keys(file.equipment),
        })
    }

    pub fn exercise_name<'a>(&'a self, text: &'a str) -> &'a str {
        lookup(&self.exercises, text)
    }

    pub fn muscle<'a>(&'a self, text: &'a str) -> &'a str {
        lookup(&self.muscles, text)
    }

    pub fn equipment<'a>(&'a self, text: &'a str) -> &'a str {
        lookup(&self.equipment, text)
    }

    /// Translate name and labels; a changed name keeps the original in
    /// `original_name` unless one is already set
    pub fn apply(&self, mut record: ExerciseRecord) -> ExerciseRecord {
        let translated = self.exercise_name(&record.name).to_string();
        if translated != record.name {
            let original = std::mem::replace(&mut record.name, translated);
            record.original_name.get_or_insert(original);
        }

        record.primary_muscle = record.primary_muscle.map(|m| self.muscle(&m).to_string());
        record.equipment = record.equipment.map(|e| self.equipment(&e).to_string());
        record.secondary_muscles = record
            .secondary_muscles
            .iter()
            .map(|m| self.muscle(m).to_string())
            .collect();
        record
    }

    pub fn len(&self) -> usize {
        self.exercises.len() + self.muscles.len() + self.equipment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lowercase_keys(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect()
}

fn lookup<'a>(map: &'a HashMap<String, String>, text: &'a str) -> &'a str {
    map.get(&text.trim().to_lowercase())
        .map(String::as_str)
        .unwrap_or(text)
}
