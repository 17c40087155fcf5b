//! Outbound interface to the container runtime
//!
//! The pool only needs a handful of primitives: find a container by name,
//! create and start one with a bind mount, run a foreground command in it, and
//! stop/remove it. `DockerRuntime` implements them with bollard; tests provide
//! their own implementations.

use crate::errors::SandboxError;
use async_trait::async_trait;

/// What the pool asks the runtime to create for a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `host:container[:mode]` bind specifications.
    pub binds: Vec<String>,
    pub working_dir: String,
    /// Long-lived foreground process that keeps the container up between calls.
    pub command: Vec<String>,
    pub labels: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub running: bool,
}

/// Exit status and combined stdout/stderr of a command run inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: String,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fails with `RuntimeUnavailable` when the runtime cannot be reached.
    async fn ping(&self) -> Result<(), SandboxError>;

    async fn image_exists(&self, image: &str) -> Result<bool, SandboxError>;

    /// Looks a container up by name; `None` when no such container exists.
    async fn find(&self, name: &str) -> Result<Option<ContainerInfo>, SandboxError>;

    /// Creates and starts a container, returning its identity.
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerInfo, SandboxError>;

    async fn start(&self, name: &str) -> Result<(), SandboxError>;

    /// Runs `cmd` in the foreground and waits for it to exit.
    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        working_dir: &str,
    ) -> Result<ExecOutput, SandboxError>;

    /// Stops and removes the container; a missing container is not an error.
    async fn stop_and_remove(&self, name: &str) -> Result<(), SandboxError>;
}
