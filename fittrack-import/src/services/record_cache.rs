//! JSON cache of fetched records, so a later run can skip the upstream API

use crate::error::ImportResult;
use crate::models::ExerciseRecord;
use std::path::Path;
use tracing::{debug, info};

pub struct RecordCache;

impl RecordCache {
    /// Write records as pretty JSON, replacing any previous cache
    pub fn save(path: &Path, records: &[ExerciseRecord]) -> ImportResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(records)?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, path)?;

        info!(path = %path.display(), records = records.len(), "Saved record cache");
        Ok(())
    }

    /// Cached records, or `None` when no cache file exists
    pub fn load(path: &Path) -> ImportResult<Option<Vec<ExerciseRecord>>> {
        if !path.exists() {
            debug!(path = %path.display(), "No record cache");
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let records: Vec<ExerciseRecord> = serde_json::from_str(&content)?;
        info!(path = %path.display(), records = records.len(), "Loaded record cache");
        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_cache_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(RecordCache::load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_preserves_unicode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let records = vec![ExerciseRecord {
            name: "Flexão de Braço".to_string(),
            instructions: Some(vec!["Desça".to_string(), "Suba".to_string()]),
            external_id: Some("ABC123".to_string()),
            ..Default::default()
        }];
        RecordCache::save(&path, &records).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Flexão de Braço"));

        let loaded = RecordCache::load(&path).unwrap().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(RecordCache::load(&path).is_err());
    }
}
