//! Per-tenant sandboxed execution of agent-authored code.
//!
//! Code produced by an agent arrives as `(code, language, user_id, task_id)`
//! and leaves as an `ExecutionResult` envelope. In between:
//!
//! - **Workspaces**: `<root>/<user_id>/<task_id>` directories on the host
//! - **Sandbox pool**: one long-lived container per tenant, bind-mounting the
//!   tenant's workspace root, with per-tenant serialization
//! - **Dispatch**: code is written as a script into the task directory and run
//!   inside the container from the task's mapped path
//! - **Normalization**: exit status and output folded into the envelope
//!
//! ```no_run
//! # async fn demo() -> Result<(), coderun_core::SandboxError> {
//! use coderun_core::{create_executor, CodeExecutor, ConfigLoader, ExecutionRequest};
//!
//! let config = ConfigLoader::load(None).await?;
//! let executor = create_executor(&config)?;
//! let result = executor
//!     .execute(&ExecutionRequest::new("print('hello')", "python", "alice", ""))
//!     .await?;
//! println!("{}", result.to_json());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod executors;
pub mod result;
pub mod sandbox;
pub mod tools;
pub mod workspace;

pub use config::{ConfigLoader, CoderunConfig, ExecutionBackend};
pub use errors::SandboxError;
pub use executors::{
    create_executor, CodeExecutor, ExecutionRequest, Language, LocalExecutor, SandboxedExecutor,
};
pub use result::{ExecutionResult, NO_OUTPUT_SENTINEL};
pub use sandbox::{ContainerRuntime, DockerRuntime, SandboxPool};
pub use tools::{Tool, ToolFactory, ToolRegistry};
pub use workspace::WorkspaceAllocator;
