//! Service configuration

use anyhow::{Context, Result};
use corbel_lib::narrative::{GeminiConfig, PromptLanguage, DEFAULT_BASE_URL, DEFAULT_MODEL};
use corbel_lib::predictor::{ArtifactChecksums, ArtifactPaths};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "CORBEL_CONFIG";

/// Audit service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Socket address for the page, API and health/metrics endpoints
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,
}

/// Where the trained artifacts live and how to verify them
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(flatten)]
    pub paths: ArtifactPaths,

    #[serde(default)]
    pub checksums: ArtifactChecksums,
}

/// Narrative backend settings. The API key is per request and never configured.
#[derive(Debug, Clone, Deserialize)]
pub struct NarrativeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub language: PromptLanguage,

    /// No timeout unless set
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            language: PromptLanguage::default(),
            timeout_secs: None,
        }
    }
}

impl NarrativeConfig {
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8501".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl ServiceConfig {
    /// Load configuration from the file named by `CORBEL_CONFIG` (if any) and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration from an optional file overlaid by `CORBEL_*` variables.
    ///
    /// Nested keys use `__`, e.g. `CORBEL_ARTIFACTS__MODEL`.
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CORBEL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid service configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let config = ServiceConfig::load_from(None).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8501");
        assert_eq!(config.artifacts.paths, ArtifactPaths::default());
        assert_eq!(config.artifacts.checksums, ArtifactChecksums::default());
        assert_eq!(config.narrative.model, DEFAULT_MODEL);
        assert_eq!(config.narrative.language, PromptLanguage::Es);
        assert!(config.narrative.gemini_config().timeout.is_none());
    }

    #[test]
    fn test_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
listen_addr = "127.0.0.1:9000"

[artifacts]
model = "/srv/corbel/modelo_corbel.json"

[artifacts.checksums]
model = "abc123"

[narrative]
language = "en"
timeout_secs = 45
"#
        )
        .unwrap();

        let config = ServiceConfig::load_from(Some(file.path())).unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(
            config.artifacts.paths.model,
            PathBuf::from("/srv/corbel/modelo_corbel.json")
        );
        assert_eq!(
            config.artifacts.paths.input_scaler,
            ArtifactPaths::default().input_scaler
        );
        assert_eq!(config.artifacts.checksums.model.as_deref(), Some("abc123"));
        assert_eq!(config.narrative.language, PromptLanguage::En);
        assert_eq!(
            config.narrative.gemini_config().timeout,
            Some(Duration::from_secs(45))
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = ServiceConfig::load_from(Some(Path::new("/nonexistent/corbel.toml")));
        assert!(result.is_err());
    }
}
