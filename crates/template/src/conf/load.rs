//! Load: config loading from file and environment variables.

use std::fs;
use std::path::Path;

use super::model::{ConfigError, TemplateConfig};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/template/templates.toml";

impl TemplateConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("TEMPLATE_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using defaults", config_path);
            Self::default()
        };

        config.apply_env();
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Environment variables override file settings
    pub fn apply_env(&mut self) {
        if let Some(regex) = std::env::var("TEMPLATE_REGEX").ok().and_then(|s| s.parse().ok()) {
            self.regex = regex;
        }
        if let Ok(render) = std::env::var("TEMPLATE_RENDER") {
            self.render = Some(render);
        }
        if let Some(max) = std::env::var("TEMPLATE_MAX_OUTPUT_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.max_output_bytes = max;
        }
    }
}
