//! Configuration module for the execution subsystem
//!
//! Supports YAML configuration files with per-section defaults and a few
//! environment overrides for deployment.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

#[cfg(test)]
mod tests;

use crate::errors::SandboxError;
use std::path::Path;

/// Load a configuration from a YAML file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<CoderunConfig, SandboxError> {
    ConfigLoader::from_file(path).await
}

/// Validate a configuration
pub fn validate_config(config: &CoderunConfig) -> Result<(), SandboxError> {
    config.validate()
}
