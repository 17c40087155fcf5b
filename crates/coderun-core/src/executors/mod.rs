//! Code execution backends
//!
//! `SandboxedExecutor` runs submissions inside the tenant's container;
//! `LocalExecutor` runs them as host processes inside the same workspace tree.
//! Both implement `CodeExecutor` and return the same `ExecutionResult`, so a
//! caller can switch backends without changing anything else.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{CoderunConfig, ExecutionBackend};
use crate::errors::SandboxError;
use crate::result::ExecutionResult;
use crate::sandbox::{ContainerRuntime, DockerRuntime, SandboxPool};
use crate::workspace::WorkspaceAllocator;

pub mod artifact;
pub mod dispatcher;
pub mod local;

pub use dispatcher::SandboxedExecutor;
pub use local::LocalExecutor;

/// Languages a submission may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Shell,
}

impl Language {
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => ".py",
            Language::Shell => ".sh",
        }
    }

    /// Whether the artifact is marked executable before it runs.
    pub fn needs_exec_permission(&self) -> bool {
        match self {
            Language::Python => false,
            Language::Shell => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Shell => "shell",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = SandboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "shell" | "sh" | "bash" => Ok(Language::Shell),
            _ => Err(SandboxError::UnsupportedLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code submission as it arrives from the agent layer. `language` stays a
/// raw string here and is parsed at the executor boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
    pub user_id: String,
    /// Empty means "start a new task".
    #[serde(default)]
    pub task_id: String,
}

impl ExecutionRequest {
    pub fn new(
        code: impl Into<String>,
        language: impl Into<String>,
        user_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            user_id: user_id.into(),
            task_id: task_id.into(),
        }
    }
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Runs the submission to completion.
    ///
    /// `Err` is reserved for configuration failures and unsupported input; a
    /// script that fails is reported as `Ok` with `success == false`.
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, SandboxError>;

    /// Directory for `(user_id, task_id)`, created if needed, so callers can
    /// stage input files before running code.
    async fn allocate_workspace(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<std::path::PathBuf, SandboxError>;
}

/// Builds the executor selected by `config.backend`.
pub fn create_executor(config: &CoderunConfig) -> Result<Arc<dyn CodeExecutor>, SandboxError> {
    let workspaces = Arc::new(WorkspaceAllocator::new(config.workspace.root.clone()));
    match config.backend {
        ExecutionBackend::Docker => {
            let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect()?);
            let pool = Arc::new(SandboxPool::new(
                runtime,
                workspaces.clone(),
                config.sandbox.clone(),
            ));
            Ok(Arc::new(SandboxedExecutor::new(
                pool,
                workspaces,
                config.interpreters.clone(),
            )))
        }
        ExecutionBackend::Local => Ok(Arc::new(LocalExecutor::new(
            workspaces,
            config.interpreters.clone(),
        ))),
    }
}
