//! Configuration type definitions for the execution subsystem
//!
//! Every section is optional in YAML; missing fields fall back to defaults that
//! work on a single developer host with a local Docker daemon.

use crate::errors::SandboxError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoderunConfig {
    #[serde(default)]
    pub backend: ExecutionBackend,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub interpreters: InterpreterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where submitted code runs. Both backends return the same result envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionBackend {
    #[default]
    Docker,
    Local,
}

impl std::str::FromStr for ExecutionBackend {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(ExecutionBackend::Docker),
            "local" => Ok(ExecutionBackend::Local),
            other => Err(SandboxError::ConfigError(format!(
                "Unknown execution backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Host directory holding `<user_id>/<task_id>` trees.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_image")]
    pub image: String,
    /// Container names are `<name_prefix>-<user_id>`.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Absolute path inside the container where tenant roots are mounted.
    #[serde(default = "default_mount_target")]
    pub mount_target: String,
    #[serde(default = "default_true")]
    pub auto_remove: bool,
    #[serde(default = "default_keepalive_command")]
    pub keepalive_command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "default_python_interpreter")]
    pub python: String,
    #[serde(default = "default_shell_interpreter")]
    pub shell: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_workspace_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".coderun")
        .join("workspace")
        .join("tasks")
}

fn default_image() -> String {
    "python-data-analysis:3.11".to_string()
}

fn default_name_prefix() -> String {
    "coderun-executor".to_string()
}

fn default_mount_target() -> String {
    "/workspace/tasks".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keepalive_command() -> Vec<String> {
    vec!["tail".to_string(), "-f".to_string(), "/dev/null".to_string()]
}

fn default_python_interpreter() -> String {
    "python".to_string()
}

fn default_shell_interpreter() -> String {
    "sh".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            name_prefix: default_name_prefix(),
            mount_target: default_mount_target(),
            auto_remove: default_true(),
            keepalive_command: default_keepalive_command(),
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            python: default_python_interpreter(),
            shell: default_shell_interpreter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CoderunConfig {
    pub fn validate(&self) -> Result<(), SandboxError> {
        if self.sandbox.image.trim().is_empty() {
            return Err(SandboxError::ConfigError(
                "sandbox.image must not be empty".to_string(),
            ));
        }
        if self.sandbox.name_prefix.trim().is_empty() {
            return Err(SandboxError::ConfigError(
                "sandbox.name_prefix must not be empty".to_string(),
            ));
        }
        if !self.sandbox.mount_target.starts_with('/') {
            return Err(SandboxError::ConfigError(format!(
                "sandbox.mount_target must be an absolute path, got '{}'",
                self.sandbox.mount_target
            )));
        }
        if self.sandbox.keepalive_command.is_empty() {
            return Err(SandboxError::ConfigError(
                "sandbox.keepalive_command must not be empty".to_string(),
            ));
        }
        if self.interpreters.python.trim().is_empty() || self.interpreters.shell.trim().is_empty()
        {
            return Err(SandboxError::ConfigError(
                "interpreters.python and interpreters.shell must not be empty".to_string(),
            ));
        }
        if self.workspace.root.as_os_str().is_empty() {
            return Err(SandboxError::ConfigError(
                "workspace.root must not be empty".to_string(),
            ));
        }
        if !self.workspace.root.is_absolute() {
            return Err(SandboxError::ConfigError(format!(
                "workspace.root must be an absolute path, got '{}'",
                self.workspace.root.display()
            )));
        }
        Ok(())
    }
}
