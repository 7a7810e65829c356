//! Table schema declarations
//!
//! Single source of truth for columns that schema sync maintains.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, SyncReport, TableSchema};
use crate::Result;
use sqlx::SqlitePool;

/// Columns added after the first release of the exercises table.
///
/// Databases created by older tooling lack them; sync adds them before each
/// import run.
pub const EXERCISE_OPTIONAL_COLUMNS: [&str; 4] =
    ["animation_url", "thumbnail_url", "original_name", "external_id"];

/// `exercises` table
pub struct ExercisesTableSchema;

impl TableSchema for ExercisesTableSchema {
    fn table_name() -> &'static str {
        "exercises"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("instructions", "TEXT"),
            ColumnDefinition::new("primary_muscle_group_id", "INTEGER").not_null(),
            ColumnDefinition::new("equipment_id", "INTEGER").not_null(),
            ColumnDefinition::new("difficulty_level_id", "INTEGER").not_null(),
            ColumnDefinition::new("image_url", "TEXT"),
            ColumnDefinition::new("video_url", "TEXT"),
            ColumnDefinition::new("created_at", "TIMESTAMP").not_null(),
            ColumnDefinition::new("updated_at", "TIMESTAMP").not_null(),
            // Media and provenance columns
            ColumnDefinition::new("animation_url", "TEXT"),
            ColumnDefinition::new("thumbnail_url", "TEXT"),
            ColumnDefinition::new("original_name", "TEXT"),
            ColumnDefinition::new("external_id", "TEXT"),
        ]
    }
}

/// Sync every declared table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<Vec<SyncReport>> {
    Ok(vec![SchemaSync::sync_table::<ExercisesTableSchema>(pool).await?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_columns_declared() {
        let columns = ExercisesTableSchema::expected_columns();
        for name in EXERCISE_OPTIONAL_COLUMNS {
            let column = columns.iter().find(|c| c.name == name).unwrap();
            assert!(!column.not_null, "{} must stay nullable", name);
        }
    }

    #[test]
    fn test_name_is_natural_key() {
        let columns = ExercisesTableSchema::expected_columns();
        let name = columns.iter().find(|c| c.name == "name").unwrap();
        assert!(name.unique && name.not_null);
    }
}
