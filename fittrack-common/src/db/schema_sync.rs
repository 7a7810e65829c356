//! Declarative schema synchronization
//!
//! Tables are declared in code ([`TableSchema`]); on startup the declared
//! columns are compared with `PRAGMA table_info` and any missing column is
//! added with `ALTER TABLE ... ADD COLUMN`. Running it twice is a no-op, which
//! is what lets optional exercise columns (`animation_url`, `external_id`, ...)
//! appear on databases created by older tooling.
//!
//! Initialization order:
//! 1. `CREATE TABLE IF NOT EXISTS` creates missing tables
//! 2. [`SchemaSync::sync_table`] adds missing columns
//! 3. Reference rows are seeded
//!
//! Type or constraint drift is reported but never auto-fixed.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "TIMESTAMP")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// DEFAULT expression, already SQL-quoted
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// `ALTER TABLE ... ADD COLUMN` clause for this column.
    ///
    /// SQLite cannot add PRIMARY KEY or UNIQUE columns, and NOT NULL only
    /// with a DEFAULT; those constraints are dropped here and reported by
    /// the caller.
    fn add_column_sql(&self, table: &str) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, self.name, self.sql_type
        );
        match (&self.default_value, self.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, _) => {}
        }
        sql
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between declared and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column missing from database (auto-fixed)
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (requires a manual migration)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint missing on an existing column (requires table recreation)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declared schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Outcome of syncing one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub table: String,
    /// Columns added by this sync
    pub added_columns: Vec<String>,
    /// Drift that could not be fixed automatically
    pub unresolved: Vec<SchemaDrift>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.added_columns.is_empty() && self.unresolved.is_empty()
    }
}

/// Schema introspection via `PRAGMA table_info`
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name` ordered by cid
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);
        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Drift detection
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite type affinity comparison
    fn types_compatible(expected: &str, actual: &str) -> bool {
        fn affinity(sql_type: &str) -> &'static str {
            let t = sql_type.to_uppercase();
            if t.contains("INT") {
                "INTEGER"
            } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
                "TEXT"
            } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
                "REAL"
            } else if t.is_empty() || t.contains("BLOB") {
                "BLOB"
            } else {
                "NUMERIC"
            }
        }

        expected.eq_ignore_ascii_case(actual) || affinity(expected) == affinity(actual)
    }
}

/// Applies declared schemas to the database
pub struct SchemaSync;

impl SchemaSync {
    /// Add every declared column missing from `T`'s table.
    ///
    /// A table that does not exist yet is skipped; it is expected to be
    /// created by `CREATE TABLE IF NOT EXISTS` before syncing.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<SyncReport> {
        let table_name = T::table_name();
        let mut report = SyncReport {
            table: table_name.to_string(),
            ..Default::default()
        };

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!(table = table_name, "Schema sync skipped: table does not exist");
            return Ok(report);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                    report.added_columns.push(column.name);
                }
                other => {
                    warn!(?other, "Schema drift requires a manual migration");
                    report.unresolved.push(other);
                }
            }
        }

        if report.is_noop() {
            debug!(table = table_name, "Schema up to date");
        } else if !report.added_columns.is_empty() {
            info!(
                table = table_name,
                columns = ?report.added_columns,
                "Schema sync added columns"
            );
        }

        Ok(report)
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        if column.primary_key || column.unique {
            warn!(
                table,
                column = %column.name,
                "PRIMARY KEY/UNIQUE cannot be added via ALTER TABLE; column added without it"
            );
        }
        if column.not_null && column.default_value.is_none() {
            warn!(
                table,
                column = %column.name,
                "NOT NULL column without DEFAULT added as nullable"
            );
        }

        match sqlx::query(&column.add_column_sql(table)).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                // Added by a concurrent initializer
                debug!(table, column = %column.name, "Column already present");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    struct Widgets;

    impl TableSchema for Widgets {
        fn table_name() -> &'static str {
            "widgets"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "INTEGER").primary_key(),
                ColumnDefinition::new("name", "TEXT").not_null().unique(),
                ColumnDefinition::new("color", "TEXT"),
                ColumnDefinition::new("stock", "INTEGER").not_null().default("0"),
            ]
        }
    }

    #[test]
    fn test_column_definition_builder() {
        let col = ColumnDefinition::new("status", "TEXT")
            .not_null()
            .default("'pending'");

        assert!(col.not_null);
        assert_eq!(
            col.add_column_sql("jobs"),
            "ALTER TABLE jobs ADD COLUMN status TEXT NOT NULL DEFAULT 'pending'"
        );
        assert_eq!(
            ColumnDefinition::new("note", "TEXT").add_column_sql("jobs"),
            "ALTER TABLE jobs ADD COLUMN note TEXT"
        );
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "text"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR(255)"));
        assert!(SchemaDiff::types_compatible("REAL", "DOUBLE"));
        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("REAL", "TEXT"));
    }

    #[tokio::test]
    async fn test_sync_adds_missing_columns_once() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();

        let first = SchemaSync::sync_table::<Widgets>(&pool).await.unwrap();
        assert_eq!(first.added_columns, vec!["color".to_string(), "stock".to_string()]);

        let columns = SchemaIntrospector::introspect_table(&pool, "widgets").await.unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[3].default_value.as_deref(), Some("0"));

        let second = SchemaSync::sync_table::<Widgets>(&pool).await.unwrap();
        assert!(second.is_noop());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_reported_not_fixed() {
        let pool = setup_test_db().await;
        sqlx::query(
            "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL, color INTEGER, stock INTEGER NOT NULL DEFAULT 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let report = SchemaSync::sync_table::<Widgets>(&pool).await.unwrap();
        assert!(report.added_columns.is_empty());
        assert_eq!(report.unresolved.len(), 1);
        assert!(matches!(
            &report.unresolved[0],
            SchemaDrift::TypeMismatch { column, .. } if column == "color"
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_skipped() {
        let pool = setup_test_db().await;
        assert!(!SchemaIntrospector::table_exists(&pool, "widgets").await.unwrap());

        let report = SchemaSync::sync_table::<Widgets>(&pool).await.unwrap();
        assert!(report.is_noop());
    }
}
