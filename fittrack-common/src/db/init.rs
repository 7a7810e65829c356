//! Database initialization
//!
//! Opening a database is idempotent: tables are created if missing, declared
//! columns are synced, and the reference rows the importer falls back on are
//! seeded with `INSERT OR IGNORE`.

use crate::config::FallbackLabels;
use crate::db::models::CategoryKind;
use crate::db::table_schemas::sync_all_table_schemas;
use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Difficulty levels present in every database
pub const DEFAULT_DIFFICULTY_LEVELS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];

/// Open (or create) the database file and bring the schema up to date
pub async fn init_database(db_path: &Path, fallbacks: &FallbackLabels) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // The importer is sequential; a small pool is enough and keeps SQLite
    // writer contention away.
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    prepare(&pool, fallbacks).await?;
    Ok(pool)
}

/// In-memory database with the full schema, for tests and dry runs.
///
/// A single connection that never expires: every connection to
/// `sqlite::memory:` is a separate database.
pub async fn init_memory_database(fallbacks: &FallbackLabels) -> Result<SqlitePool> {
    let pool = memory_pool().await?;
    prepare(&pool, fallbacks).await?;
    Ok(pool)
}

/// Bare in-memory pool without schema
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}

async fn prepare(pool: &SqlitePool, fallbacks: &FallbackLabels) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    create_schema(pool).await?;
    seed_reference_rows(pool, fallbacks).await?;
    Ok(())
}

/// Create tables and sync declared columns, without seeding
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    for kind in CategoryKind::ALL {
        create_category_table(pool, kind).await?;
    }
    create_exercises_table(pool).await?;

    // Optional columns arrive through schema sync, so a database created
    // before they existed gets them the same way a fresh one does.
    sync_all_table_schemas(pool).await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_exercises_external_id ON exercises(external_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_category_table(pool: &SqlitePool, kind: CategoryKind) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
        kind.table_name()
    );
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

async fn create_exercises_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            instructions TEXT,
            primary_muscle_group_id INTEGER NOT NULL REFERENCES muscle_groups(id),
            equipment_id INTEGER NOT NULL REFERENCES equipments(id),
            difficulty_level_id INTEGER NOT NULL REFERENCES difficulty_levels(id),
            image_url TEXT,
            video_url TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Seed default difficulty levels and the configured fallback labels
pub async fn seed_reference_rows(pool: &SqlitePool, fallbacks: &FallbackLabels) -> Result<()> {
    let mut seeds: Vec<(CategoryKind, &str)> = DEFAULT_DIFFICULTY_LEVELS
        .iter()
        .map(|name| (CategoryKind::Difficulty, *name))
        .collect();
    seeds.push((CategoryKind::Difficulty, fallbacks.difficulty.as_str()));
    seeds.push((CategoryKind::Equipment, fallbacks.equipment.as_str()));
    seeds.push((CategoryKind::MuscleGroup, fallbacks.muscle_group.as_str()));

    let mut inserted = 0u64;
    for (kind, name) in seeds {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let sql = format!("INSERT OR IGNORE INTO {} (name) VALUES (?)", kind.table_name());
        inserted += sqlx::query(&sql).bind(name).execute(pool).await?.rows_affected();
    }

    if inserted > 0 {
        info!(inserted, "Seeded reference rows");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_database_is_seeded() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();

        assert_eq!(count(&pool, "difficulty_levels").await, 3);
        assert_eq!(count(&pool, "equipments").await, 1);
        assert_eq!(count(&pool, "muscle_groups").await, 1);
        assert_eq!(count(&pool, "exercises").await, 0);
    }

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        seed_reference_rows(&pool, &FallbackLabels::default()).await.unwrap();
        create_schema(&pool).await.unwrap();

        assert_eq!(count(&pool, "difficulty_levels").await, 3);
        assert_eq!(count(&pool, "equipments").await, 1);
    }

    #[tokio::test]
    async fn test_custom_fallback_difficulty_is_seeded() {
        let fallbacks = FallbackLabels {
            difficulty: "Intermediário".to_string(),
            ..Default::default()
        };
        let pool = init_memory_database(&fallbacks).await.unwrap();

        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM difficulty_levels WHERE name = 'Intermediário'")
                .fetch_optional(&pool)
                .await
                .unwrap();
        assert!(found.is_some());
        assert_eq!(count(&pool, "difficulty_levels").await, 4);
    }
}
