//! Host-process backend
//!
//! Runs submissions directly on the host from the task directory. There is no
//! isolation beyond the working directory; it exists for development machines
//! without Docker and returns exactly the same envelope as the sandbox.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use super::artifact::{invocation, strip_code_fences, Artifact};
use super::{CodeExecutor, ExecutionRequest, Language};
use crate::config::InterpreterConfig;
use crate::errors::SandboxError;
use crate::result::{ExecutionResult, ResultContext};
use crate::sandbox::ExecOutput;
use crate::workspace::{generate_task_id, validate_identifier, WorkspaceAllocator};

pub struct LocalExecutor {
    workspaces: Arc<WorkspaceAllocator>,
    interpreters: InterpreterConfig,
}

impl LocalExecutor {
    pub fn new(workspaces: Arc<WorkspaceAllocator>, interpreters: InterpreterConfig) -> Self {
        Self {
            workspaces,
            interpreters,
        }
    }

    pub async fn run(
        &self,
        code: &str,
        language: &str,
        user_id: &str,
        task_id: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        let language: Language = language.parse()?;
        validate_identifier("user_id", user_id)?;
        let task_id = if task_id.is_empty() {
            generate_task_id()
        } else {
            validate_identifier("task_id", task_id)?;
            task_id.to_string()
        };

        let task_dir = self.workspaces.allocate(user_id, &task_id).await?;
        let ctx = ResultContext {
            user_id,
            task_id: &task_id,
            working_directory: &task_dir,
        };

        log::debug!(
            "Running {} code locally for user '{}' task '{}'",
            language,
            user_id,
            task_id
        );

        let result = match self.execute_in(language, code, &task_dir).await {
            Ok(output) => ExecutionResult::from_exit(output.exit_code, &output.output, &ctx),
            Err(e) => ExecutionResult::from_error(&e, &ctx),
        };
        Ok(result)
    }

    async fn execute_in(
        &self,
        language: Language,
        code: &str,
        task_dir: &std::path::Path,
    ) -> Result<ExecOutput, SandboxError> {
        let code = strip_code_fences(code);
        let artifact = Artifact::materialize(task_dir, language, &code)?;
        let script = artifact.path().to_string_lossy().into_owned();
        let cmd = invocation(language, &self.interpreters, &script);

        let outcome = Command::new(&cmd[0])
            .args(&cmd[1..])
            .current_dir(task_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        artifact.cleanup();

        let output = outcome?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            // Killed by a signal: no exit code, still a failure.
            exit_code: output.status.code().map(i64::from).unwrap_or(-1),
            output: text,
        })
    }
}

#[async_trait]
impl CodeExecutor for LocalExecutor {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, SandboxError> {
        self.run(
            &request.code,
            &request.language,
            &request.user_id,
            &request.task_id,
        )
        .await
    }

    async fn allocate_workspace(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<PathBuf, SandboxError> {
        self.workspaces.allocate(user_id, task_id).await
    }
}
