//! Media URL reachability check (HEAD requests)

use crate::error::{ImportError, ImportResult};
use crate::models::ExerciseRecord;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlValidationReport {
    pub checked: usize,
    pub valid: usize,
    pub invalid: Vec<String>,
    /// Relative paths and other non-HTTP references, not requested
    pub skipped: usize,
}

impl UrlValidationReport {
    pub fn render(&self, max_listed: usize) -> String {
        let mut out = format!(
            "URLs checked: {} (valid {}, invalid {}, skipped {})\n",
            self.checked,
            self.valid,
            self.invalid.len(),
            self.skipped
        );
        for url in self.invalid.iter().take(max_listed) {
            out.push_str("  invalid: ");
            out.push_str(url);
            out.push('\n');
        }
        out
    }
}

/// Distinct image and animation URLs, in first-seen order
pub fn collect_media_urls(records: &[ExerciseRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|r| [r.image_url.as_deref(), r.animation_url.as_deref()])
        .flatten()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .filter(|url| seen.insert(url.to_string()))
        .map(str::to_string)
        .collect()
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub struct UrlValidator {
    http_client: reqwest::Client,
}

impl UrlValidator {
    pub fn new(timeout: Duration) -> ImportResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImportError::SourceFetch {
                page: None,
                message: e.to_string(),
            })?;
        Ok(Self { http_client })
    }

    /// HEAD every HTTP URL; 2xx and 3xx count as valid
    pub async fn validate(&self, urls: &[String]) -> UrlValidationReport {
        let mut report = UrlValidationReport::default();

        for url in urls {
            if !is_http(url) {
                report.skipped += 1;
                continue;
            }

            report.checked += 1;
            match self.http_client.head(url).send().await {
                Ok(response) if response.status().is_success() || response.status().is_redirection() => {
                    report.valid += 1;
                }
                Ok(response) => {
                    debug!(url = %url, status = response.status().as_u16(), "URL rejected");
                    report.invalid.push(url.clone());
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "URL unreachable");
                    report.invalid.push(url.clone());
                }
            }
        }

        report
    }
}
