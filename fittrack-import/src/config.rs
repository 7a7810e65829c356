//! Configuration resolution for fittrack-import
//!
//! The Hevy API key is resolved CLI → ENV → TOML.

use fittrack_common::config::TomlConfig;
use fittrack_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable holding the Hevy API key
pub const HEVY_API_KEY_ENV: &str = "FITTRACK_HEVY_API_KEY";

/// Resolve the Hevy API key from the three sources, highest priority first
pub fn resolve_hevy_api_key(cli_key: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(HEVY_API_KEY_ENV).ok();
    let toml_key = toml_config.hevy_api_key.as_deref();

    let candidates = [
        ("command line", cli_key),
        ("environment", env_key.as_deref()),
        ("TOML", toml_key),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Hevy API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (source, key) in candidates {
        if let Some(key) = key.filter(|k| is_valid_key(k)) {
            info!("Hevy API key loaded from {}", source);
            return Ok(key.trim().to_string());
        }
    }

    Err(Error::Config(format!(
        "Hevy API key not configured. Please configure using one of:\n\
         1. Command line: --api-key your-key-here\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: ~/.config/fittrack/config.toml (hevy_api_key = \"your-key\")",
        HEVY_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
