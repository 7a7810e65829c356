//! Hevy API client
//!
//! Exercise templates are paged; `exercise_stream` walks the pages lazily and
//! a minimum interval is kept between any two requests.

use crate::error::{ImportError, ImportResult};
use crate::models::{ExerciseDetail, ExerciseRecord};
use crate::services::normalizer::clean;
use crate::workflow::enrichment::DetailSource;
use async_stream::try_stream;
use async_trait::async_trait;
use fittrack_common::config::{ImportSettings, TomlConfig};
use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const HEVY_BASE_URL: &str = "https://api.hevyapp.com/v1";
const USER_AGENT: &str = concat!("fittrack-import/", env!("CARGO_PKG_VERSION"));

/// One page of `GET /exercise_templates`
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatePage {
    pub page: u32,
    pub page_count: u32,
    #[serde(default)]
    pub exercise_templates: Vec<HevyTemplate>,
}

/// Exercise template as returned by Hevy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HevyTemplate {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "equipments")]
    pub equipment: Option<String>,
    pub primary_muscle_group: Option<String>,
    pub secondary_muscle_groups: Vec<String>,
    pub image_url: Option<String>,
    pub animation_url: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructions: Vec<String>,
}

impl From<HevyTemplate> for ExerciseRecord {
    fn from(t: HevyTemplate) -> Self {
        ExerciseRecord {
            name: t.title,
            description: t.description,
            instructions: (!t.instructions.is_empty()).then_some(t.instructions),
            primary_muscle: t.primary_muscle_group,
            equipment: t.equipment,
            difficulty: None,
            image_url: t.image_url,
            animation_url: t.animation_url,
            video_url: t.video_url,
            thumbnail_url: t.thumbnail_url,
            external_id: clean(Some(t.id)),
            original_name: None,
            secondary_muscles: t.secondary_muscle_groups,
        }
    }
}

impl From<HevyTemplate> for ExerciseDetail {
    fn from(t: HevyTemplate) -> Self {
        ExerciseDetail {
            description: clean(t.description),
            instructions: t.instructions,
            image_url: clean(t.image_url),
            animation_url: clean(t.animation_url),
            video_url: clean(t.video_url),
            thumbnail_url: clean(t.thumbnail_url),
        }
    }
}

/// Detail responses come wrapped or bare
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailResponse {
    Wrapped { exercise_template: HevyTemplate },
    Bare(HevyTemplate),
}

impl DetailResponse {
    fn into_template(self) -> HevyTemplate {
        match self {
            DetailResponse::Wrapped { exercise_template } => exercise_template,
            DetailResponse::Bare(template) => template,
        }
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct HevyClientSettings {
    pub base_url: String,
    pub page_size: u32,
    pub min_interval: Duration,
    pub timeout: Duration,
}

impl HevyClientSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        let import: &ImportSettings = &config.import;
        Self {
            base_url: config
                .hevy_base_url
                .clone()
                .unwrap_or_else(|| HEVY_BASE_URL.to_string()),
            page_size: import.page_size,
            min_interval: Duration::from_millis(import.page_delay_ms),
            timeout: Duration::from_secs(import.request_timeout_secs),
        }
    }
}

impl Default for HevyClientSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// Minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

pub struct HevyClient {
    http_client: reqwest::Client,
    base_url: String,
    page_size: u32,
    rate_limiter: RateLimiter,
}

impl HevyClient {
    pub fn new(api_key: &str, settings: HevyClientSettings) -> ImportResult<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.trim()).map_err(|e| ImportError::SourceFetch {
            page: None,
            message: format!("API key is not a valid header value: {}", e),
        })?;
        key.set_sensitive(true);
        headers.insert("api-key", key);

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ImportError::SourceFetch {
                page: None,
                message: e.to_string(),
            })?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size,
            rate_limiter: RateLimiter::new(settings.min_interval),
        })
    }

    /// Fetch one page of templates (1-based)
    pub async fn fetch_page(&self, page: u32) -> ImportResult<TemplatePage> {
        self.rate_limiter.wait().await;

        let url = format!(
            "{}/exercise_templates?page={}&pageSize={}",
            self.base_url, page, self.page_size
        );
        debug!(page, url = %url, "Fetching exercise templates");

        let fetch_error = |message: String| ImportError::SourceFetch {
            page: Some(page),
            message,
        };

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        response
            .json::<TemplatePage>()
            .await
            .map_err(|e| fetch_error(format!("invalid page body: {}", e)))
    }

    /// Lazily walk every page, yielding records until `page >= page_count`.
    ///
    /// A failed page ends the stream with that error.
    pub fn exercise_stream(&self) -> impl Stream<Item = ImportResult<ExerciseRecord>> + '_ {
        try_stream! {
            let mut page = 1u32;
            loop {
                let body = self.fetch_page(page).await?;
                info!(
                    page = body.page,
                    page_count = body.page_count,
                    templates = body.exercise_templates.len(),
                    "Fetched page"
                );

                for template in body.exercise_templates {
                    yield ExerciseRecord::from(template);
                }

                if body.page >= body.page_count {
                    break;
                }
                page = page.max(body.page) + 1;
            }
        }
    }

    /// Fetch every page eagerly (used when writing the record cache)
    pub async fn fetch_all(&self) -> ImportResult<Vec<ExerciseRecord>> {
        use futures::TryStreamExt;
        self.exercise_stream().try_collect().await
    }

    /// Detail for one template; `None` when the id is unknown upstream
    pub async fn fetch_detail(&self, external_id: &str) -> ImportResult<Option<ExerciseDetail>> {
        self.rate_limiter.wait().await;

        let url = format!("{}/exercise_templates/{}", self.base_url, external_id);
        debug!(external_id, url = %url, "Fetching exercise detail");

        let fetch_error = |message: String| ImportError::SourceFetch {
            page: None,
            message: format!("detail {}: {}", external_id, message),
        };

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fetch_error(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        let detail = response
            .json::<DetailResponse>()
            .await
            .map_err(|e| fetch_error(format!("invalid body: {}", e)))?;

        Ok(Some(detail.into_template().into()))
    }
}

#[async_trait]
impl DetailSource for HevyClient {
    async fn fetch_detail(&self, external_id: &str) -> ImportResult<Option<ExerciseDetail>> {
        HevyClient::fetch_detail(self, external_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parses_with_equipments_alias() {
        let page: TemplatePage = serde_json::from_str(
            r#"{
                "page": 1,
                "page_count": 3,
                "exercise_templates": [{
                    "id": "D04AC939",
                    "title": "Squat (Barbell)",
                    "type": "weight_reps",
                    "primary_muscle_group": "quadriceps",
                    "secondary_muscle_groups": ["glutes", "hamstrings"],
                    "equipments": "barbell",
                    "image_url": "",
                    "is_custom": false
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(page.page_count, 3);
        let record = ExerciseRecord::from(page.exercise_templates[0].clone());
        assert_eq!(record.name, "Squat (Barbell)");
        assert_eq!(record.equipment.as_deref(), Some("barbell"));
        assert_eq!(record.external_id.as_deref(), Some("D04AC939"));
        assert_eq!(record.secondary_muscles, vec!["glutes", "hamstrings"]);
        assert_eq!(record.instructions, None);
    }

    #[test]
    fn test_detail_accepts_wrapped_and_bare() {
        let wrapped: DetailResponse = serde_json::from_str(
            r#"{"exercise_template": {"id": "A", "title": "Plank", "description": "Hold", "instructions": ["Brace"]}}"#,
        )
        .unwrap();
        let detail: ExerciseDetail = wrapped.into_template().into();
        assert_eq!(detail.description.as_deref(), Some("Hold"));
        assert_eq!(detail.instructions, vec!["Brace"]);

        let bare: DetailResponse =
            serde_json::from_str(r#"{"id": "A", "title": "Plank", "video_url": " "}"#).unwrap();
        let detail: ExerciseDetail = bare.into_template().into();
        assert_eq!(detail.video_url, None);
        assert!(detail.is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = TomlConfig::default();
        config.hevy_base_url = Some("http://localhost:9000/v1/".to_string());
        config.import.page_delay_ms = 0;

        let settings = HevyClientSettings::from_config(&config);
        assert_eq!(settings.min_interval, Duration::ZERO);

        let client = HevyClient::new("key", settings).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn test_invalid_api_key_is_rejected() {
        assert!(HevyClient::new("bad\nkey", HevyClientSettings::default()).is_err());
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
