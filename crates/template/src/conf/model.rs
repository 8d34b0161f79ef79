//! Model: TemplateConfig and its error type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compile::TemplateCompiler;
use crate::regex::GrepRegexEngine;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Allow `:R:` regex fields.
    pub regex: bool,
    /// Template used to render records read from stdin.
    pub render: Option<String>,
    /// Renders longer than this fail (0 = unlimited).
    pub max_output_bytes: usize,
    /// Template directives: `name, "body" [, option]*`.
    pub directives: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            regex: true,
            render: None,
            max_output_bytes: 0,
            directives: Vec::new(),
        }
    }
}

impl TemplateConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.render {
            if name.trim().is_empty() {
                return Err("render must name a template when set".to_string());
            }
        }
        for (i, directive) in self.directives.iter().enumerate() {
            if !directive.contains(',') {
                return Err(format!(
                    "directives[{}] must have the form name, \"body\": {}",
                    i, directive
                ));
            }
        }
        Ok(())
    }

    /// Compiler matching this configuration.
    pub fn compiler(&self) -> TemplateCompiler {
        let compiler = TemplateCompiler::new();
        if self.regex {
            compiler.with_regex(Arc::new(GrepRegexEngine))
        } else {
            compiler
        }
    }
}
