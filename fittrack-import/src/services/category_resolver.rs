//! Category label to id resolution
//!
//! One resolver lives for one run. All lookup rows are loaded up front; a
//! label not in the cache is inserted, and when that insert loses a race with
//! another writer the existing id is read back. Resolving the same label
//! twice always yields the same id.

use crate::db::categories;
use crate::error::{ImportError, ImportResult};
use crate::models::ResolvedCategory;
use fittrack_common::config::FallbackLabels;
use fittrack_common::db::CategoryKind;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct CategoryResolver {
    pool: SqlitePool,
    fallback_labels: FallbackLabels,
    cache: HashMap<CategoryKind, HashMap<String, i64>>,
    fallback_ids: HashMap<CategoryKind, i64>,
    created: usize,
}

impl CategoryResolver {
    /// Load every lookup table into the run cache
    pub async fn load(pool: SqlitePool, fallback_labels: FallbackLabels) -> ImportResult<Self> {
        let mut cache = HashMap::new();
        for kind in CategoryKind::ALL {
            let rows = categories::load_categories(&pool, kind).await?;
            debug!(kind = %kind, count = rows.len(), "Loaded categories");
            cache.insert(
                kind,
                rows.into_iter().map(|r| (r.name, r.id)).collect::<HashMap<_, _>>(),
            );
        }

        Ok(Self {
            pool,
            fallback_labels,
            cache,
            fallback_ids: HashMap::new(),
            created: 0,
        })
    }

    /// Id for a label, creating the category when unseen.
    ///
    /// A blank label resolves to the fallback id.
    pub async fn resolve(&mut self, kind: CategoryKind, label: &str) -> ImportResult<i64> {
        let label = label.trim();
        if label.is_empty() {
            return self.fallback_id(kind).await;
        }

        if let Some(id) = self.cached(kind, label) {
            return Ok(id);
        }

        let id = match categories::insert_category(&self.pool, kind, label).await? {
            Some(id) => {
                self.created += 1;
                info!(kind = %kind, label, id, "Created category");
                id
            }
            None => categories::find_category_id(&self.pool, kind, label)
                .await?
                .ok_or_else(|| ImportError::CategoryResolution {
                    kind,
                    message: format!("'{}' conflicted on insert but cannot be read back", label),
                })?,
        };

        self.cache
            .entry(kind)
            .or_default()
            .insert(label.to_string(), id);
        Ok(id)
    }

    /// Resolve an optional label, remembering whether the fallback was used
    pub async fn resolve_optional(
        &mut self,
        kind: CategoryKind,
        label: Option<&str>,
    ) -> ImportResult<ResolvedCategory> {
        match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => Ok(ResolvedCategory::explicit(self.resolve(kind, label).await?)),
            None => Ok(ResolvedCategory::fallback(self.fallback_id(kind).await?)),
        }
    }

    /// Fallback id of a kind: the designated label when present, otherwise
    /// the lowest id. Determined once per run.
    pub async fn fallback_id(&mut self, kind: CategoryKind) -> ImportResult<i64> {
        if let Some(id) = self.fallback_ids.get(&kind) {
            return Ok(*id);
        }

        let designated = self.designated_label(kind).trim().to_string();
        let designated_id = match self.cached(kind, &designated) {
            Some(id) => Some(id),
            None => categories::find_category_id(&self.pool, kind, &designated).await?,
        };

        let id = match designated_id {
            Some(id) => id,
            None => {
                let lowest = categories::lowest_category_id(&self.pool, kind)
                    .await?
                    .ok_or_else(|| ImportError::CategoryResolution {
                        kind,
                        message: format!(
                            "no fallback: '{}' is missing and {} is empty",
                            designated,
                            kind.table_name()
                        ),
                    })?;
                warn!(
                    kind = %kind,
                    designated = %designated,
                    id = lowest,
                    "Designated fallback missing, using lowest id"
                );
                lowest
            }
        };

        self.fallback_ids.insert(kind, id);
        Ok(id)
    }

    /// Categories created during this run
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Labels currently cached for a kind
    pub fn cached_len(&self, kind: CategoryKind) -> usize {
        self.cache.get(&kind).map(HashMap::len).unwrap_or(0)
    }

    fn cached(&self, kind: CategoryKind, label: &str) -> Option<i64> {
        self.cache.get(&kind).and_then(|m| m.get(label)).copied()
    }

    fn designated_label(&self, kind: CategoryKind) -> &str {
        match kind {
            CategoryKind::MuscleGroup => &self.fallback_labels.muscle_group,
            CategoryKind::Equipment => &self.fallback_labels.equipment,
            CategoryKind::Difficulty => &self.fallback_labels.difficulty,
        }
    }
}
