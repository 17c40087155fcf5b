//! `code_executor` and `task_workspace` tools

use crate::errors::SandboxError;
use crate::executors::{CodeExecutor, ExecutionRequest};
use crate::tools::{Tool, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const CODE_EXECUTOR: &str = "code_executor";
const TASK_WORKSPACE: &str = "task_workspace";

pub struct CodeExecutorTool {
    executor: Arc<dyn CodeExecutor>,
}

impl CodeExecutorTool {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for CodeExecutorTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: CODE_EXECUTOR.to_string(),
            description: "Runs Python code or a shell script in the user's sandbox and returns a JSON result with success, output and error. Use language='python' for Python and language='bash' or 'sh' for shell scripts. Pass the task_id from a previous result to keep working in the same task directory; omit it to start a new task.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "Source code to run"
                    },
                    "language": {
                        "type": "string",
                        "enum": ["python", "bash", "sh", "shell"],
                        "description": "Language of the code"
                    },
                    "user_id": {
                        "type": "string",
                        "description": "Identifies the user whose sandbox runs the code"
                    },
                    "task_id": {
                        "type": "string",
                        "description": "Existing task to continue; omit to create a new one"
                    }
                },
                "required": ["code", "language", "user_id"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, SandboxError> {
        let request: ExecutionRequest =
            serde_json::from_value(arguments).map_err(|e| SandboxError::ToolError {
                tool_name: CODE_EXECUTOR.to_string(),
                message: format!("Invalid arguments: {}", e),
            })?;

        let result = self.executor.execute(&request).await?;
        Ok(result.to_json())
    }
}

pub struct WorkspaceTool {
    executor: Arc<dyn CodeExecutor>,
}

impl WorkspaceTool {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for WorkspaceTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: TASK_WORKSPACE.to_string(),
            description: "Returns the working directory of a user's task, creating it if needed, so files can be placed there before running code.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "user_id": { "type": "string" },
                    "task_id": { "type": "string" }
                },
                "required": ["user_id", "task_id"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, SandboxError> {
        let field = |name: &str| {
            arguments
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| SandboxError::ToolError {
                    tool_name: TASK_WORKSPACE.to_string(),
                    message: format!("Missing or invalid '{}' parameter", name),
                })
        };
        let user_id = field("user_id")?;
        let task_id = field("task_id")?;

        let path = self.executor.allocate_workspace(&user_id, &task_id).await?;
        Ok(path.display().to_string())
    }
}
