//! Lookup table access (muscle groups, equipment, difficulty levels)

use fittrack_common::db::{CategoryKind, CategoryRecord};
use sqlx::SqlitePool;

/// All rows of a lookup table, ordered by id
pub async fn load_categories(
    pool: &SqlitePool,
    kind: CategoryKind,
) -> Result<Vec<CategoryRecord>, sqlx::Error> {
    let sql = format!("SELECT id, name FROM {} ORDER BY id", kind.table_name());
    let rows: Vec<(i64, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| CategoryRecord { id, name })
        .collect())
}

/// Insert a label; `None` when another writer created it first
pub async fn insert_category(
    pool: &SqlitePool,
    kind: CategoryKind,
    name: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!(
        "INSERT INTO {} (name) VALUES (?) ON CONFLICT(name) DO NOTHING RETURNING id",
        kind.table_name()
    );
    sqlx::query_scalar(&sql).bind(name).fetch_optional(pool).await
}

/// Id of an exact label
pub async fn find_category_id(
    pool: &SqlitePool,
    kind: CategoryKind,
    name: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!("SELECT id FROM {} WHERE name = ?", kind.table_name());
    sqlx::query_scalar(&sql).bind(name).fetch_optional(pool).await
}

/// Lowest id of a lookup table, `None` when empty
pub async fn lowest_category_id(
    pool: &SqlitePool,
    kind: CategoryKind,
) -> Result<Option<i64>, sqlx::Error> {
    let sql = format!("SELECT MIN(id) FROM {}", kind.table_name());
    sqlx::query_scalar(&sql).fetch_one(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use fittrack_common::config::FallbackLabels;
    use fittrack_common::db::init_memory_database;

    #[tokio::test]
    async fn test_insert_then_conflict() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();

        let id = insert_category(&pool, CategoryKind::MuscleGroup, "Legs")
            .await
            .unwrap();
        assert!(id.is_some());

        let again = insert_category(&pool, CategoryKind::MuscleGroup, "Legs")
            .await
            .unwrap();
        assert_eq!(again, None);

        let found = find_category_id(&pool, CategoryKind::MuscleGroup, "Legs")
            .await
            .unwrap();
        assert_eq!(found, id);
    }

    #[tokio::test]
    async fn test_lowest_id_of_empty_table_is_none() {
        let pool = fittrack_common::db::memory_pool().await.unwrap();
        fittrack_common::db::create_schema(&pool).await.unwrap();

        let lowest = lowest_category_id(&pool, CategoryKind::Equipment)
            .await
            .unwrap();
        assert_eq!(lowest, None);
    }

    #[tokio::test]
    async fn test_load_categories_ordered_by_id() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        let rows = load_categories(&pool, CategoryKind::Difficulty).await.unwrap();

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Beginner", "Intermediate", "Advanced"]);
    }
}
