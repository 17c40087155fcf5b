//! Shared helpers for dispatcher integration tests
//!
//! `HostRuntime` stands in for Docker: a "container" is just the bind mounts
//! it was created with, and exec runs the command on the host after mapping
//! sandbox paths back through those mounts. That is enough to observe what the
//! dispatcher does to the filesystem and which commands it issues.

#![allow(dead_code)]

use async_trait::async_trait;
use coderun_core::config::{CoderunConfig, InterpreterConfig};
use coderun_core::errors::SandboxError;
use coderun_core::executors::SandboxedExecutor;
use coderun_core::sandbox::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ExecOutput, MountMapping, SandboxPool,
};
use coderun_core::workspace::WorkspaceAllocator;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::process::Command;

#[derive(Default)]
pub struct HostRuntime {
    pub containers: Mutex<HashMap<String, (ContainerInfo, Vec<MountMapping>)>>,
    pub calls: AtomicUsize,
    pub creates: AtomicUsize,
    pub offline: bool,
    /// Commands whose first argument equals this fail at the runtime level.
    pub fail_exec_of: Option<String>,
    pub commands: Mutex<Vec<(String, Vec<String>, String)>>,
}

impl HostRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn to_host(&self, name: &str, sandbox_path: &str) -> Option<String> {
        let containers = self.containers.lock().unwrap();
        let (_, mounts) = containers.get(name)?;
        mounts
            .iter()
            .find_map(|m| m.to_host(sandbox_path).ok())
            .map(|p| p.display().to_string())
    }
}

#[async_trait]
impl ContainerRuntime for HostRuntime {
    async fn ping(&self) -> Result<(), SandboxError> {
        self.touch();
        if self.offline {
            Err(SandboxError::RuntimeUnavailable(
                "Cannot connect to the Docker daemon".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn image_exists(&self, _image: &str) -> Result<bool, SandboxError> {
        self.touch();
        Ok(true)
    }

    async fn find(&self, name: &str) -> Result<Option<ContainerInfo>, SandboxError> {
        self.touch();
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get(name)
            .map(|(info, _)| info.clone()))
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerInfo, SandboxError> {
        self.touch();
        let n = self.creates.fetch_add(1, Ordering::SeqCst) + 1;
        let mounts = spec
            .binds
            .iter()
            .map(|bind| {
                let parts: Vec<&str> = bind.split(':').collect();
                MountMapping::new(parts[0], parts[1])
            })
            .collect();
        let info = ContainerInfo {
            id: format!("host-{}", n),
            name: spec.name.clone(),
            running: true,
        };
        self.containers
            .lock()
            .unwrap()
            .insert(spec.name.clone(), (info.clone(), mounts));
        Ok(info)
    }

    async fn start(&self, _name: &str) -> Result<(), SandboxError> {
        self.touch();
        Ok(())
    }

    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        working_dir: &str,
    ) -> Result<ExecOutput, SandboxError> {
        self.touch();
        self.commands
            .lock()
            .unwrap()
            .push((name.to_string(), cmd.to_vec(), working_dir.to_string()));

        if self.fail_exec_of.as_deref() == cmd.first().map(String::as_str) {
            return Err(SandboxError::ContainerError {
                operation: "create_exec",
                container: name.to_string(),
                message: "container is not running".to_string(),
            });
        }

        let args: Vec<String> = cmd
            .iter()
            .map(|arg| self.to_host(name, arg).unwrap_or_else(|| arg.clone()))
            .collect();
        let cwd = self.to_host(name, working_dir).ok_or_else(|| SandboxError::ContainerError {
            operation: "exec",
            container: name.to_string(),
            message: format!("working directory {} is not mounted", working_dir),
        })?;

        let output = Command::new(&args[0])
            .args(&args[1..])
            .current_dir(cwd)
            .output()
            .await?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            exit_code: output.status.code().map(i64::from).unwrap_or(-1),
            output: text,
        })
    }

    async fn stop_and_remove(&self, name: &str) -> Result<(), SandboxError> {
        self.touch();
        self.containers.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Python interpreter available on this host, if any.
pub fn host_python() -> Option<String> {
    ["python3", "python"]
        .iter()
        .find(|name| which::which(name).is_ok())
        .map(|name| name.to_string())
}

pub fn executor_with(
    runtime: Arc<HostRuntime>,
    root: &Path,
) -> (Arc<SandboxedExecutor>, Arc<SandboxPool>) {
    let config = CoderunConfig::default();
    let interpreters = InterpreterConfig {
        python: host_python().unwrap_or_else(|| "python3".to_string()),
        shell: "sh".to_string(),
    };
    let workspaces = Arc::new(WorkspaceAllocator::new(root));
    let pool = Arc::new(SandboxPool::new(
        runtime,
        workspaces.clone(),
        config.sandbox,
    ));
    let executor = Arc::new(SandboxedExecutor::new(pool.clone(), workspaces, interpreters));
    (executor, pool)
}
