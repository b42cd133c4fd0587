use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "CLAIM_CHECK_CONFIG_PATH";
const ENV_RULES_PATH: &str = "CLINICAL_RULES_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Path to a rule-base file overriding the bundled rules.
    #[serde(default)]
    pub rules_path: Option<String>,
    /// Whether consistency checks also surface candidate diagnoses.
    #[serde(default = "default_suggest_candidates")]
    pub suggest_candidates: bool,
}

fn default_suggest_candidates() -> bool {
    true
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub rules_path: Option<String>,
    pub suggest_candidates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_path: None,
            suggest_candidates: true,
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        // Environment overrides the file
        let rules_path = std::env::var(ENV_RULES_PATH).ok().or(file.rules_path);

        Self {
            rules_path,
            suggest_candidates: file.suggest_candidates,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }
}
