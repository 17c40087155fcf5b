//! Dispatching code submissions into tenant sandboxes

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::artifact::{invocation, strip_code_fences, Artifact};
use super::{CodeExecutor, ExecutionRequest, Language};
use crate::config::InterpreterConfig;
use crate::errors::SandboxError;
use crate::result::{ExecutionResult, ResultContext};
use crate::sandbox::{SandboxLease, SandboxPool};
use crate::workspace::{generate_task_id, validate_identifier, WorkspaceAllocator};

pub struct SandboxedExecutor {
    pool: Arc<SandboxPool>,
    workspaces: Arc<WorkspaceAllocator>,
    interpreters: InterpreterConfig,
}

impl SandboxedExecutor {
    pub fn new(
        pool: Arc<SandboxPool>,
        workspaces: Arc<WorkspaceAllocator>,
        interpreters: InterpreterConfig,
    ) -> Self {
        Self {
            pool,
            workspaces,
            interpreters,
        }
    }

    /// Runs `code` for `(user_id, task_id)`. An empty `task_id` starts a new
    /// task; the generated id is reported in the result.
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
        let mut lease = self.pool.acquire(user_id).await?;
        lease.set_work_dir(&task_dir).await?;

        log::debug!(
            "Dispatching {} code for user '{}' task '{}' into {}",
            language,
            user_id,
            task_id,
            lease.handle().name()
        );

        let ctx = ResultContext {
            user_id,
            task_id: &task_id,
            working_directory: &task_dir,
        };

        let result = match self.execute_in(&mut lease, language, code, &task_dir).await {
            Ok(output) => ExecutionResult::from_exit(output.exit_code, &output.output, &ctx),
            Err(e) => {
                log::warn!(
                    "Execution in sandbox {} failed: {}",
                    lease.handle().name(),
                    e
                );
                ExecutionResult::from_error(&e, &ctx)
            }
        };

        Ok(result)
    }

    async fn execute_in(
        &self,
        lease: &mut SandboxLease,
        language: Language,
        code: &str,
        task_dir: &std::path::Path,
    ) -> Result<crate::sandbox::ExecOutput, SandboxError> {
        let code = strip_code_fences(code);
        let artifact = Artifact::materialize(task_dir, language, &code)?;

        let outcome = match lease.handle().mount().to_sandbox(artifact.path()) {
            Ok(script) => {
                let cmd = invocation(language, &self.interpreters, &script);
                lease.exec(&cmd).await
            }
            Err(e) => Err(e),
        };

        artifact.cleanup();
        outcome
    }
}

#[async_trait]
impl CodeExecutor for SandboxedExecutor {
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
