//! Exercise table access
//!
//! Every write follows the same merge rule: a new value replaces the stored
//! one, a missing value (`NULL` bind) keeps it. Placeholder images are only
//! written where no image is stored.

use crate::models::{ExerciseDetail, ExerciseRow};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::warn;

/// Exercise as stored
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredExercise {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub primary_muscle_group_id: i64,
    pub equipment_id: i64,
    pub difficulty_level_id: i64,
    pub image_url: Option<String>,
    pub animation_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub external_id: Option<String>,
    pub original_name: Option<String>,
}

const UPSERT_SQL: &str = r#"
    INSERT INTO exercises (
        name, description, instructions,
        primary_muscle_group_id, equipment_id, difficulty_level_id,
        image_url, animation_url, video_url, thumbnail_url,
        external_id, original_name,
        created_at, updated_at
    ) VALUES (
        ?, ?, ?, ?, ?, ?,
        COALESCE(?, ?), ?, ?, COALESCE(?, ?),
        ?, ?,
        CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
    )
    ON CONFLICT(name) DO UPDATE SET
        description = COALESCE(excluded.description, exercises.description),
        instructions = COALESCE(excluded.instructions, exercises.instructions),
        primary_muscle_group_id = COALESCE(?, exercises.primary_muscle_group_id),
        equipment_id = COALESCE(?, exercises.equipment_id),
        difficulty_level_id = COALESCE(?, exercises.difficulty_level_id),
        image_url = COALESCE(?, NULLIF(exercises.image_url, ''), excluded.image_url, exercises.image_url),
        animation_url = COALESCE(excluded.animation_url, exercises.animation_url),
        video_url = COALESCE(excluded.video_url, exercises.video_url),
        thumbnail_url = COALESCE(
            ?,
            NULLIF(exercises.thumbnail_url, ''),
            CASE WHEN NULLIF(exercises.image_url, '') IS NULL THEN excluded.thumbnail_url END,
            exercises.thumbnail_url
        ),
        external_id = COALESCE(excluded.external_id, exercises.external_id),
        original_name = COALESCE(excluded.original_name, exercises.original_name),
        updated_at = CURRENT_TIMESTAMP
"#;

/// Insert or merge one row on its name
pub async fn upsert_exercise(
    conn: &mut SqliteConnection,
    row: &ExerciseRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(UPSERT_SQL)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.instructions)
        .bind(row.primary_muscle_group.id)
        .bind(row.equipment.id)
        .bind(row.difficulty.id)
        .bind(&row.image_url)
        .bind(&row.placeholder_image)
        .bind(&row.animation_url)
        .bind(&row.video_url)
        .bind(&row.thumbnail_url)
        .bind(&row.placeholder_image)
        .bind(&row.external_id)
        .bind(&row.original_name)
        // Fallback ids only apply to new rows
        .bind(row.primary_muscle_group.update_value())
        .bind(row.equipment.update_value())
        .bind(row.difficulty.update_value())
        // Placeholders never replace a stored image
        .bind(&row.image_url)
        .bind(&row.thumbnail_url)
        .execute(conn)
        .await?;
    Ok(())
}

/// Upsert rows in order inside one transaction; all or nothing
pub async fn upsert_exercises_atomic(
    pool: &SqlitePool,
    rows: &[&ExerciseRow],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;

    for row in rows {
        if let Err(e) = upsert_exercise(&mut tx, row).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed after upsert error");
            }
            return Err(e);
        }
    }

    tx.commit().await?;
    Ok(rows.len())
}

/// Fetch one exercise by name
pub async fn load_exercise(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<StoredExercise>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, name, description, instructions,
               primary_muscle_group_id, equipment_id, difficulty_level_id,
               image_url, animation_url, video_url, thumbnail_url,
               external_id, original_name
        FROM exercises
        WHERE name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
}

pub async fn count_exercises(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exercises")
        .fetch_one(pool)
        .await
}

/// Exercise that can be enriched from the upstream detail endpoint
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EnrichmentCandidate {
    pub id: i64,
    pub name: String,
    pub external_id: String,
}

/// Exercises with an upstream id and at least one missing text or media field
pub async fn enrichment_candidates(
    pool: &SqlitePool,
    limit: Option<usize>,
) -> Result<Vec<EnrichmentCandidate>, sqlx::Error> {
    // SQLite treats a negative LIMIT as unbounded
    let limit = limit.map(|l| l as i64).unwrap_or(-1);

    sqlx::query_as(
        r#"
        SELECT id, name, external_id
        FROM exercises
        WHERE external_id IS NOT NULL AND external_id != ''
          AND (description IS NULL OR description = ''
               OR image_url IS NULL OR image_url = ''
               OR animation_url IS NULL OR animation_url = ''
               OR video_url IS NULL OR video_url = '')
        ORDER BY id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Merge detail fields into an exercise; `instructions` is already flattened
pub async fn apply_detail(
    conn: &mut SqliteConnection,
    id: i64,
    detail: &ExerciseDetail,
    instructions: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE exercises SET
            description = COALESCE(?, description),
            instructions = COALESCE(?, instructions),
            image_url = COALESCE(?, image_url),
            animation_url = COALESCE(?, animation_url),
            video_url = COALESCE(?, video_url),
            thumbnail_url = COALESCE(?, thumbnail_url),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&detail.description)
    .bind(instructions)
    .bind(&detail.image_url)
    .bind(&detail.animation_url)
    .bind(&detail.video_url)
    .bind(&detail.thumbnail_url)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Id, name and current image of every exercise
pub async fn list_media_state(
    pool: &SqlitePool,
) -> Result<Vec<(i64, String, Option<String>)>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, image_url FROM exercises ORDER BY id")
        .fetch_all(pool)
        .await
}

/// Merge media from a static table; thumbnail follows the image
pub async fn apply_media(
    conn: &mut SqliteConnection,
    id: i64,
    image_url: Option<&str>,
    animation_url: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE exercises SET
            image_url = COALESCE(?, image_url),
            animation_url = COALESCE(?, animation_url),
            thumbnail_url = COALESCE(?, thumbnail_url),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(image_url)
    .bind(animation_url)
    .bind(image_url)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set a placeholder image where none is stored
pub async fn apply_placeholder(
    conn: &mut SqliteConnection,
    id: i64,
    placeholder_url: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE exercises SET
            image_url = ?,
            thumbnail_url = COALESCE(NULLIF(thumbnail_url, ''), ?),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND (image_url IS NULL OR image_url = '')
        "#,
    )
    .bind(placeholder_url)
    .bind(placeholder_url)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
