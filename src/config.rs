use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "medsafe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of rule-based hits under which the model fallback runs.
pub const DEFAULT_FALLBACK_THRESHOLD: usize = 3;

/// Default bound on a single text-completion exchange.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_OLLAMA_URL: &str = "MEDSAFE_OLLAMA_URL";
const ENV_MODEL: &str = "MEDSAFE_MODEL";
const ENV_TIMEOUT_SECS: &str = "MEDSAFE_TIMEOUT_SECS";
const ENV_MODEL_FALLBACK: &str = "MEDSAFE_MODEL_FALLBACK";
const ENV_FALLBACK_THRESHOLD: &str = "MEDSAFE_FALLBACK_THRESHOLD";
const ENV_DATASET: &str = "MEDSAFE_DATASET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {0}: {1}")]
    Read(String, String),

    #[error("Cannot parse config file {0}: {1}")]
    Parse(String, String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Runtime settings for the advisory engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Base URL of the Ollama instance serving text completions.
    pub ollama_url: String,
    pub model: String,
    /// Upper bound for one completion exchange, in seconds.
    pub timeout_secs: u64,
    /// When false, only curated lookups run.
    pub model_fallback: bool,
    /// Rule-based hit count below which the model fallback is consulted.
    pub fallback_threshold: usize,
    /// Alternative curated dataset; the compiled-in one is used when absent.
    pub dataset_path: Option<PathBuf>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".into(),
            model: "medgemma".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            model_fallback: true,
            fallback_threshold: DEFAULT_FALLBACK_THRESHOLD,
            dataset_path: None,
        }
    }
}

impl AdvisorConfig {
    /// Defaults, then the user config file if present, then environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&json)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
    }

    /// Apply `MEDSAFE_*` overrides from the given variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_OLLAMA_URL) {
            self.ollama_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = parse_value(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MODEL_FALLBACK) {
            self.model_fallback = parse_flag(ENV_MODEL_FALLBACK, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FALLBACK_THRESHOLD) {
            self.fallback_threshold = parse_value(ENV_FALLBACK_THRESHOLD, &raw)?;
        }
        if let Some(path) = lookup(ENV_DATASET) {
            self.dataset_path = Some(PathBuf::from(path));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Per-user config file: `<config dir>/medsafe/config.json`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medsafe=info,warn"
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_ollama() {
        let config = AdvisorConfig::default();
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.fallback_threshold, 3);
        assert!(config.model_fallback);
        assert!(config.dataset_path.is_none());
    }

    #[test]
    fn env_overrides_replace_defaults() {
        let mut config = AdvisorConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("MEDSAFE_OLLAMA_URL", "http://gpu-box:11434"),
                ("MEDSAFE_MODEL", "llama3:8b"),
                ("MEDSAFE_TIMEOUT_SECS", "12"),
                ("MEDSAFE_MODEL_FALLBACK", "off"),
                ("MEDSAFE_FALLBACK_THRESHOLD", "5"),
                ("MEDSAFE_DATASET", "/etc/medsafe/interactions.json"),
            ]))
            .unwrap();

        assert_eq!(config.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.timeout_secs, 12);
        assert!(!config.model_fallback);
        assert_eq!(config.fallback_threshold, 5);
        assert_eq!(
            config.dataset_path,
            Some(PathBuf::from("/etc/medsafe/interactions.json"))
        );
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let mut config = AdvisorConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("MEDSAFE_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config
            .apply_overrides(lookup_from(&[("MEDSAFE_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let mut config = AdvisorConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("MEDSAFE_MODEL_FALLBACK", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn file_keeps_defaults_for_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "model": "medgemma:27b", "timeout_secs": 90 }}"#).unwrap();

        let config = AdvisorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model, "medgemma:27b");
        assert_eq!(config.timeout_secs, 90);
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.fallback_threshold, 3);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AdvisorConfig::from_file(file.path()),
            Err(ConfigError::Parse(_, _))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AdvisorConfig::from_file(&dir.path().join("absent.json")),
            Err(ConfigError::Read(_, _))
        ));
    }

    #[test]
    fn config_file_lives_under_app_dir() {
        if let Some(path) = config_file_path() {
            assert!(path.ends_with("medsafe/config.json"));
        }
    }
}
