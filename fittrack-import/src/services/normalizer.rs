//! Raw record to destination row
//!
//! Text is trimmed and blank strings become `None`. Media URLs pass through
//! as given. Category labels go through the resolver.

use crate::error::{ImportError, ImportResult};
use crate::models::{ExerciseRecord, ExerciseRow};
use crate::services::category_resolver::CategoryResolver;
use fittrack_common::db::CategoryKind;

/// Reject records that cannot become a row
pub fn validate(index: usize, record: &ExerciseRecord) -> ImportResult<()> {
    if record.name.trim().is_empty() {
        return Err(ImportError::Validation {
            index,
            message: "exercise name is empty".to_string(),
        });
    }
    Ok(())
}

/// Trim; blank becomes `None`
pub fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == v.len() {
            Some(v)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Flatten ordered steps into stored text.
///
/// Blank steps are dropped. A single step is kept as-is; several become
/// `"1. first\n2. second"`.
pub fn format_instructions<S: AsRef<str>>(steps: &[S]) -> Option<String> {
    let steps: Vec<&str> = steps
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();

    match steps.len() {
        0 => None,
        1 => Some(steps[0].to_string()),
        _ => Some(
            steps
                .iter()
                .enumerate()
                .map(|(i, step)| format!("{}. {}", i + 1, step))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}

/// Build the destination row, resolving the three category labels
pub async fn normalize(
    record: ExerciseRecord,
    resolver: &mut CategoryResolver,
) -> ImportResult<ExerciseRow> {
    let primary_muscle_group = resolver
        .resolve_optional(CategoryKind::MuscleGroup, record.primary_muscle.as_deref())
        .await?;
    let equipment = resolver
        .resolve_optional(CategoryKind::Equipment, record.equipment.as_deref())
        .await?;
    let difficulty = resolver
        .resolve_optional(CategoryKind::Difficulty, record.difficulty.as_deref())
        .await?;

    Ok(ExerciseRow {
        name: record.name.trim().to_string(),
        description: clean(record.description),
        instructions: record.instructions.as_deref().and_then(format_instructions),
        primary_muscle_group,
        equipment,
        difficulty,
        image_url: clean(record.image_url),
        animation_url: clean(record.animation_url),
        video_url: clean(record.video_url),
        thumbnail_url: clean(record.thumbnail_url),
        external_id: clean(record.external_id),
        original_name: clean(record.original_name),
        placeholder_image: None,
    })
}
