use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_turns: {0}. Must be between 1 and 100")]
    InvalidMaxTurns(u32),

    #[error("Invalid max_parallel_sub_tasks: {0}. Must be at least 1")]
    InvalidMaxParallel(usize),

    #[error("Invalid retry_max: {0}. Must be at least 1")]
    InvalidRetryMax(u32),

    #[error("Invalid complexity_word_threshold: {0}. Must be at least 1")]
    InvalidComplexityThreshold(usize),

    #[error("Invalid script_timeout_secs: {0}. Must be positive")]
    InvalidScriptTimeout(u64),

    #[error("Sandbox base_dir cannot be empty")]
    EmptySandboxBase,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid deny pattern {pattern:?}: {cause}")]
    InvalidDenyPattern { pattern: String, cause: String },

    #[error("Allowed path must be absolute: {0}")]
    RelativeAllowedPath(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .heike/config.yaml (project config)
    /// 3. .heike/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`HEIKE_`* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".heike/config.yaml"))
            .merge(Yaml::file(".heike/local.yaml"))
            .merge(Env::prefixed("HEIKE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.engine.max_turns == 0 || config.engine.max_turns > 100 {
            return Err(ConfigError::InvalidMaxTurns(config.engine.max_turns));
        }

        if config.coordinator.max_parallel_sub_tasks == 0 {
            return Err(ConfigError::InvalidMaxParallel(
                config.coordinator.max_parallel_sub_tasks,
            ));
        }

        if config.coordinator.retry_max == 0 {
            return Err(ConfigError::InvalidRetryMax(config.coordinator.retry_max));
        }

        if config.coordinator.complexity_word_threshold == 0 {
            return Err(ConfigError::InvalidComplexityThreshold(
                config.coordinator.complexity_word_threshold,
            ));
        }

        if config.runtime.script_timeout_secs == 0 {
            return Err(ConfigError::InvalidScriptTimeout(
                config.runtime.script_timeout_secs,
            ));
        }

        if config.sandbox.base_dir.is_empty() {
            return Err(ConfigError::EmptySandboxBase);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        for pattern in &config.policy.deny_patterns {
            if let Err(err) = regex::Regex::new(pattern) {
                return Err(ConfigError::InvalidDenyPattern {
                    pattern: pattern.clone(),
                    cause: err.to_string(),
                });
            }
        }

        for path in &config.policy.allowed_paths {
            if !std::path::Path::new(path).is_absolute() {
                return Err(ConfigError::RelativeAllowedPath(path.clone()));
            }
        }

        Ok(())
    }
}
