//! Coverage report over the exercises table

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt::Write as _;

/// Sample row shown in the report
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SampleExercise {
    pub name: String,
    pub image_url: Option<String>,
    pub animation_url: Option<String>,
    pub video_url: Option<String>,
}

/// Field population counts; blank strings count as missing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub generated_at: DateTime<Utc>,
    pub total: i64,
    pub with_description: i64,
    pub with_instructions: i64,
    pub with_image: i64,
    pub with_animation: i64,
    pub with_video: i64,
    pub with_thumbnail: i64,
    /// (muscle group, exercise count), largest first
    pub by_muscle_group: Vec<(String, i64)>,
    pub samples: Vec<SampleExercise>,
}

impl CoverageReport {
    /// Share of `count` over the total, in percent
    pub fn percentage(&self, count: i64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }

    /// Human-readable rendition for the console
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Exercises: {} (as of {})",
            self.total,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for (label, count) in [
            ("description", self.with_description),
            ("instructions", self.with_instructions),
            ("image", self.with_image),
            ("animation", self.with_animation),
            ("video", self.with_video),
            ("thumbnail", self.with_thumbnail),
        ] {
            let _ = writeln!(
                out,
                "  with {:<13} {:>6} ({:.1}%)",
                label,
                count,
                self.percentage(count)
            );
        }

        if !self.by_muscle_group.is_empty() {
            let _ = writeln!(out, "By muscle group:");
            for (group, count) in &self.by_muscle_group {
                let _ = writeln!(out, "  {:<24} {:>6}", group, count);
            }
        }

        if !self.samples.is_empty() {
            let _ = writeln!(out, "Sample:");
            for sample in &self.samples {
                let _ = writeln!(out, "  {}", sample.name);
                let _ = writeln!(out, "    image:     {}", sample.image_url.as_deref().unwrap_or("-"));
                let _ = writeln!(out, "    animation: {}", sample.animation_url.as_deref().unwrap_or("-"));
                let _ = writeln!(out, "    video:     {}", sample.video_url.as_deref().unwrap_or("-"));
            }
        }
        out
    }
}

/// total, description, instructions, image, animation, video, thumbnail
type FieldCounts = (i64, i64, i64, i64, i64, i64, i64);

/// Build the report, including up to `sample_size` rows
pub async fn coverage_report(
    pool: &SqlitePool,
    sample_size: usize,
) -> Result<CoverageReport, sqlx::Error> {
    let counts: FieldCounts = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(NULLIF(description, '')),
               COUNT(NULLIF(instructions, '')),
               COUNT(NULLIF(image_url, '')),
               COUNT(NULLIF(animation_url, '')),
               COUNT(NULLIF(video_url, '')),
               COUNT(NULLIF(thumbnail_url, ''))
        FROM exercises
        "#,
    )
    .fetch_one(pool)
    .await?;

    let by_muscle_group: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT mg.name, COUNT(e.id) AS n
        FROM exercises e
        JOIN muscle_groups mg ON mg.id = e.primary_muscle_group_id
        GROUP BY mg.name
        ORDER BY n DESC, mg.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let samples: Vec<SampleExercise> = sqlx::query_as(
        "SELECT name, image_url, animation_url, video_url FROM exercises ORDER BY id LIMIT ?",
    )
    .bind(sample_size as i64)
    .fetch_all(pool)
    .await?;

    Ok(CoverageReport {
        generated_at: Utc::now(),
        total: counts.0,
        with_description: counts.1,
        with_instructions: counts.2,
        with_image: counts.3,
        with_animation: counts.4,
        with_video: counts.5,
        with_thumbnail: counts.6,
        by_muscle_group,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fittrack_common::config::FallbackLabels;
    use fittrack_common::db::init_memory_database;

    #[tokio::test]
    async fn test_empty_store_report() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        let report = coverage_report(&pool, 5).await.unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.percentage(report.with_image), 0.0);
        assert!(report.samples.is_empty());
        assert!(report.render().starts_with("Exercises: 0"));
    }

    #[tokio::test]
    async fn test_blank_urls_count_as_missing() {
        let pool = init_memory_database(&FallbackLabels::default()).await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO exercises (name, primary_muscle_group_id, equipment_id, difficulty_level_id, image_url, video_url)
            VALUES ('A', 1, 1, 1, 'https://img/a.png', ''),
                   ('B', 1, 1, 1, '', NULL)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let report = coverage_report(&pool, 1).await.unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.with_image, 1);
        assert_eq!(report.with_video, 0);
        assert_eq!(report.percentage(report.with_image), 50.0);
        assert_eq!(report.by_muscle_group, vec![("Full Body".to_string(), 2)]);
        assert_eq!(report.samples.len(), 1);
        assert_eq!(report.samples[0].name, "A");
    }
}
