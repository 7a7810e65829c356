//! Shared database models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookup tables referenced by foreign key from `exercises`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    MuscleGroup,
    Equipment,
    Difficulty,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 3] = [
        CategoryKind::MuscleGroup,
        CategoryKind::Equipment,
        CategoryKind::Difficulty,
    ];

    /// Lookup table holding this kind
    pub fn table_name(self) -> &'static str {
        match self {
            CategoryKind::MuscleGroup => "muscle_groups",
            CategoryKind::Equipment => "equipments",
            CategoryKind::Difficulty => "difficulty_levels",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CategoryKind::MuscleGroup => "muscle group",
            CategoryKind::Equipment => "equipment",
            CategoryKind::Difficulty => "difficulty",
        };
        f.write_str(label)
    }
}

/// Row of a lookup table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}
