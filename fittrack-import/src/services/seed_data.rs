//! Static seed table of exercises

use crate::error::ImportResult;
use crate::models::ExerciseRecord;
use std::path::Path;

const BUILTIN_SEED: &str = include_str!("../../data/seed_exercises.json");

/// Records from the given JSON file, or the bundled table
pub fn load_seed_records(path: Option<&Path>) -> ImportResult<Vec<ExerciseRecord>> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => Ok(serde_json::from_str(BUILTIN_SEED)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_seed_is_well_formed() {
        let records = load_seed_records(None).unwrap();
        assert!(!records.is_empty());

        let names: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), records.len(), "seed names must be unique");

        for record in &records {
            assert!(!record.name.trim().is_empty());
            assert!(record.primary_muscle.is_some(), "{} lacks a muscle group", record.name);
        }
    }
}
