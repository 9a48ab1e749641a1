//! ---
//! rra_section: "01-core-functionality"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Shared primitives and utilities for the editor bridge."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_channel_id() -> String {
    "rra-frontend".to_owned()
}

fn default_editor_url() -> Url {
    Url::parse("http://localhost:8000/").expect("valid default editor url")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

/// Primary configuration object for the editor bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "RRA_CONFIG";

    /// Load configuration from disk, respecting the `RRA_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.editor.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the embedded editor lives and how the host addresses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Base URL loaded into the editor frame.
    #[serde(default = "default_editor_url")]
    pub url: Url,
    /// Explicit editor origin. Derived from `url` when absent.
    #[serde(default)]
    pub origin: Option<String>,
    /// Channel id stamped on every envelope.
    #[serde(default = "default_channel_id")]
    pub channel_id: String,
    /// Post with the `*` target origin and accept messages from any origin.
    #[serde(default)]
    pub allow_any_origin: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            url: default_editor_url(),
            origin: None,
            channel_id: default_channel_id(),
            allow_any_origin: false,
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_id.trim().is_empty() {
            return Err(anyhow!("editor.channel_id must not be empty"));
        }
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "editor.url must use http or https, got '{}'",
                self.url.scheme()
            ));
        }
        if let Some(origin) = &self.origin {
            let parsed = Url::parse(origin)
                .with_context(|| format!("editor.origin '{}' is not a valid origin", origin))?;
            if parsed.origin().ascii_serialization() != origin.trim_end_matches('/') {
                return Err(anyhow!(
                    "editor.origin '{}' must be a bare scheme://host[:port] origin",
                    origin
                ));
            }
        }
        Ok(())
    }

    /// Origin the host posts to and accepts messages from.
    ///
    /// `None` means any origin, which is only returned when `allow_any_origin` is set.
    pub fn target_origin(&self) -> Option<String> {
        if self.allow_any_origin {
            return None;
        }
        Some(match &self.origin {
            Some(origin) => origin.trim_end_matches('/').to_owned(),
            None => self.url.origin().ascii_serialization(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}
