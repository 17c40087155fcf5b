//! Configuration loader for YAML files and environment overrides
//!
//! Files are parsed with `serde_yaml`, then a small set of `CODERUN_*`
//! environment variables override what the file says, and the result is
//! validated before it is handed out.

use crate::config::types::*;
use crate::errors::SandboxError;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ENV_WORKSPACE_ROOT: &str = "CODERUN_WORKSPACE_ROOT";
pub const ENV_IMAGE: &str = "CODERUN_IMAGE";
pub const ENV_BACKEND: &str = "CODERUN_BACKEND";

/// Configuration loader with environment resolution
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<CoderunConfig, SandboxError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            SandboxError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_str(content: &str) -> Result<CoderunConfig, SandboxError> {
        // An empty document deserializes to unit, not to a struct full of defaults.
        let mut config: CoderunConfig = if content.trim().is_empty() {
            CoderunConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| {
                SandboxError::ConfigError(format!("Failed to parse YAML config: {}", e))
            })?
        };

        Self::resolve_environment(&mut config)?;
        Self::resolve_paths(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise start from defaults plus environment.
    pub async fn load(path: Option<&Path>) -> Result<CoderunConfig, SandboxError> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => {
                let mut config = CoderunConfig::default();
                Self::resolve_environment(&mut config)?;
                Self::resolve_paths(&mut config)?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Anchors a relative workspace root at the current directory. The root
    /// ends up in a Docker bind spec, which only accepts absolute host paths.
    fn resolve_paths(config: &mut CoderunConfig) -> Result<(), SandboxError> {
        let root = &config.workspace.root;
        if root.as_os_str().is_empty() || root.is_absolute() {
            return Ok(());
        }
        config.workspace.root = std::path::absolute(root).map_err(|e| {
            SandboxError::ConfigError(format!(
                "Cannot resolve workspace.root '{}': {}",
                root.display(),
                e
            ))
        })?;
        Ok(())
    }

    fn resolve_environment(config: &mut CoderunConfig) -> Result<(), SandboxError> {
        if let Ok(root) = env::var(ENV_WORKSPACE_ROOT) {
            if !root.trim().is_empty() {
                config.workspace.root = PathBuf::from(root);
            }
        }

        if let Ok(image) = env::var(ENV_IMAGE) {
            if !image.trim().is_empty() {
                config.sandbox.image = image;
            }
        }

        if let Ok(backend) = env::var(ENV_BACKEND) {
            if !backend.trim().is_empty() {
                config.backend = backend.parse()?;
            }
        }

        Ok(())
    }
}
