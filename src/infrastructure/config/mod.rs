//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment: YAML file loading,
//! environment variable overrides, and validation.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
