//! Error types for the sandbox execution subsystem
//!
//! Failures fall into a few categories with different propagation rules.
//! Configuration problems (runtime unreachable, image absent, bad settings) and
//! unsupported input (unknown language, unsafe identifiers) abort a request
//! with an `Err`. A script that exits non-zero is not an error at all: it is
//! reported as an `ExecutionResult` with `success == false`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Sandbox image '{0}' not found")]
    ImageNotFound(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Invalid {kind} '{value}': must match [A-Za-z0-9][A-Za-z0-9_.-]{{0,127}}")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("Path {path} is outside the sandbox mount {mount}")]
    PathOutsideMount { path: String, mount: String },
    #[error("Container operation '{operation}' failed for '{container}': {message}")]
    ContainerError {
        operation: &'static str,
        container: String,
        message: String,
    },
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("Bollard (Docker client) error: {0}")]
    BollardError(#[from] bollard::errors::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SandboxError {
    /// Configuration failures that abort the whole request and must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SandboxError::RuntimeUnavailable(_)
                | SandboxError::ImageNotFound(_)
                | SandboxError::ConfigError(_)
        )
    }

    /// Input that is rejected before any side effect.
    pub fn is_unsupported_input(&self) -> bool {
        matches!(
            self,
            SandboxError::UnsupportedLanguage(_)
                | SandboxError::InvalidIdentifier { .. }
                | SandboxError::ToolError { .. }
        )
    }

    pub(crate) fn container(
        operation: &'static str,
        container: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        SandboxError::ContainerError {
            operation,
            container: container.into(),
            message: err.to_string(),
        }
    }
}
