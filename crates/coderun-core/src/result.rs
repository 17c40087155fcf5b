//! Result envelope returned for every execution request
//!
//! Whatever happened inside the sandbox, callers get the same shape back:
//! `success` is true exactly when `error` is empty, and `output`/`error` are
//! never both populated.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reported when a script exits cleanly without printing anything, so an empty
/// `output` is never mistaken for a failure.
pub const NO_OUTPUT_SENTINEL: &str = "Code executed successfully with no output";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub user_id: String,
    pub task_id: String,
    pub success: bool,
    pub output: String,
    pub error: String,
    pub working_directory: PathBuf,
}

/// Identity of the request a result belongs to.
#[derive(Debug, Clone)]
pub struct ResultContext<'a> {
    pub user_id: &'a str,
    pub task_id: &'a str,
    pub working_directory: &'a Path,
}

impl ExecutionResult {
    /// Maps a finished process onto the envelope. A non-zero exit puts every
    /// captured byte in `error`, even text the process wrote to stdout.
    pub fn from_exit(exit_code: i64, raw_output: &str, ctx: &ResultContext<'_>) -> Self {
        if exit_code != 0 {
            let error = if raw_output.is_empty() {
                format!("Process exited with status {}", exit_code)
            } else {
                raw_output.to_string()
            };
            return Self::failure(error, ctx);
        }

        let output = if raw_output.is_empty() {
            NO_OUTPUT_SENTINEL.to_string()
        } else {
            raw_output.to_string()
        };
        Self {
            user_id: ctx.user_id.to_string(),
            task_id: ctx.task_id.to_string(),
            success: true,
            output,
            error: String::new(),
            working_directory: ctx.working_directory.to_path_buf(),
        }
    }

    /// Envelope for an error raised while talking to the sandbox.
    pub fn from_error(err: &dyn std::fmt::Display, ctx: &ResultContext<'_>) -> Self {
        let message = err.to_string();
        let message = if message.is_empty() {
            "Execution failed".to_string()
        } else {
            message
        };
        Self::failure(message, ctx)
    }

    fn failure(error: String, ctx: &ResultContext<'_>) -> Self {
        Self {
            user_id: ctx.user_id.to_string(),
            task_id: ctx.task_id.to_string(),
            success: false,
            output: String::new(),
            error,
            working_directory: ctx.working_directory.to_path_buf(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"output":"","error":"failed to serialize result: {}"}}"#,
                e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn ctx(dir: &Path) -> ResultContext<'_> {
        ResultContext {
            user_id: "alice",
            task_id: "t1",
            working_directory: dir,
        }
    }

    #[test]
    fn test_zero_exit_with_output() {
        let dir = Path::new("/w/alice/t1");
        let result = ExecutionResult::from_exit(0, "hello\n", &ctx(dir));
        assert!(result.success);
        assert_eq!(result.output, "hello\n");
        assert_eq!(result.error, "");
    }

    #[test]
    fn test_zero_exit_without_output_uses_sentinel() {
        let dir = Path::new("/w/alice/t1");
        let result = ExecutionResult::from_exit(0, "", &ctx(dir));
        assert!(result.success);
        assert_eq!(result.output, NO_OUTPUT_SENTINEL);
        assert!(result.error.is_empty());
    }

    #[test]
    fn test_non_zero_exit_routes_everything_to_error() {
        let dir = Path::new("/w/alice/t1");
        let result = ExecutionResult::from_exit(1, "partial stdout\nTraceback ...", &ctx(dir));
        assert!(!result.success);
        assert_eq!(result.output, "");
        assert_eq!(result.error, "partial stdout\nTraceback ...");
    }

    #[test]
    fn test_non_zero_exit_without_text_is_still_failure() {
        let dir = Path::new("/w/alice/t1");
        let result = ExecutionResult::from_exit(3, "", &ctx(dir));
        assert!(!result.success);
        assert_eq!(result.output, "");
        assert_eq!(result.error, "Process exited with status 3");
    }

    #[test]
    fn test_sandbox_errors_become_failed_results() {
        let dir = Path::new("/w/alice/t1");
        let err = crate::errors::SandboxError::container("create_exec", "box", "connection reset");
        let result = ExecutionResult::from_error(&err, &ctx(dir));
        assert!(!result.success);
        assert!(result.error.contains("connection reset"));
        assert!(result.output.is_empty());
    }

    #[test]
    fn test_envelope_json_shape() {
        let dir = Path::new("/w/alice/t1");
        let result = ExecutionResult::from_exit(0, "42\n", &ctx(dir));
        let value: Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": "alice",
                "task_id": "t1",
                "success": true,
                "output": "42\n",
                "error": "",
                "working_directory": "/w/alice/t1"
            })
        );
    }
}
