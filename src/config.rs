//! Pipeline configuration.
//!
//! Loaded from config.json next to the executable, with defaults for every
//! missing field. The config is handed to the pipeline at construction, so
//! pipelines with different engines or languages can run side by side.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ocr::engine::EngineConfig;

/// Complete pipeline configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tesseract executable; discovered on PATH / common install dirs when unset
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,
    /// Directory holding `<language>.traineddata`; discovered when unset
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,
    /// Tesseract language model identifier
    #[serde(default = "default_language")]
    pub language: String,
    /// Where debug images and texts are written; `None` disables them
    #[serde(default = "default_debug_dir")]
    pub debug_dir: Option<PathBuf>,
    /// Master switch for debug artifacts
    #[serde(default = "default_save_artifacts")]
    pub save_artifacts: bool,
    /// Upper bound for one screenshot, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Engine configs in sweep order; the first one drives method selection
    #[serde(default = "default_engine_configs")]
    pub engine_configs: Vec<EngineConfig>,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_debug_dir() -> Option<PathBuf> {
    Some(crate::paths::get_debug_dir())
}

fn default_save_artifacts() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_engine_configs() -> Vec<EngineConfig> {
    EngineConfig::ALL.to_vec()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            language: default_language(),
            debug_dir: default_debug_dir(),
            save_artifacts: default_save_artifacts(),
            timeout_ms: default_timeout_ms(),
            engine_configs: default_engine_configs(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a JSON file, or returns defaults.
    ///
    /// A missing or unparsable file is logged and ignored.
    pub fn load(config_path: &Path) -> Self {
        tracing::info!("Looking for config at: {}", config_path.display());

        if !config_path.exists() {
            tracing::info!("{} not found. Using default config.", config_path.display());
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
            }
        }

        Self::default()
    }

    /// Writes the default config as pretty JSON (for reference/editing).
    pub fn save_default(config_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        fs::write(config_path, json)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Engine configs to use, never empty.
    pub fn sweep_order(&self) -> &[EngineConfig] {
        if self.engine_configs.is_empty() {
            EngineConfig::ALL
        } else {
            &self.engine_configs
        }
    }

    /// Artifact directory if artifacts are enabled.
    pub fn artifact_dir(&self) -> Option<&Path> {
        if self.save_artifacts {
            self.debug_dir.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.language, "eng");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.sweep_order()[0], EngineConfig::Block);
        assert!(config.save_artifacts);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"language": "rus", "timeout_ms": 500}"#).unwrap();
        assert_eq!(config.language, "rus");
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.engine_configs, EngineConfig::ALL.to_vec());
        assert!(config.tesseract_path.is_none());
    }

    #[test]
    fn test_empty_engine_list_falls_back() {
        let config = PipelineConfig {
            engine_configs: Vec::new(),
            ..PipelineConfig::default()
        };
        assert_eq!(config.sweep_order(), EngineConfig::ALL);
    }

    #[test]
    fn test_artifact_dir_respects_switch() {
        let config = PipelineConfig {
            debug_dir: Some(PathBuf::from("debug")),
            save_artifacts: false,
            ..PipelineConfig::default()
        };
        assert!(config.artifact_dir().is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::load(&dir.path().join("config.json"));
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(PipelineConfig::load(&path), PipelineConfig::default());
    }

    #[test]
    fn test_save_default_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        PipelineConfig::save_default(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path), PipelineConfig::default());
    }
}
