//! Per-tenant sandbox pool
//!
//! Each tenant gets at most one long-lived container, named deterministically
//! from its `user_id` and bind-mounting the tenant's workspace root. The pool
//! keeps one slot per tenant behind its own async mutex; a `SandboxLease`
//! holds that mutex for as long as the caller works with the sandbox, so two
//! dispatches for the same tenant never interleave while different tenants run
//! in parallel.

pub mod docker;
pub mod mount;
pub mod runtime;

pub use docker::DockerRuntime;
pub use mount::MountMapping;
pub use runtime::{ContainerInfo, ContainerRuntime, ContainerSpec, ExecOutput};

use crate::config::SandboxConfig;
use crate::errors::SandboxError;
use crate::workspace::{validate_identifier, WorkspaceAllocator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMappedMutexGuard, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<Option<SandboxHandle>>>;

/// State the pool tracks for one tenant's container.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    user_id: String,
    name: String,
    container_id: String,
    image: String,
    mount: MountMapping,
    current_work_dir: Option<PathBuf>,
    alive: bool,
}

impl SandboxHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn mount(&self) -> &MountMapping {
        &self.mount
    }

    /// Host path of the task the sandbox currently points at.
    pub fn work_dir(&self) -> Option<&Path> {
        self.current_work_dir.as_deref()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Directory commands run from inside the container.
    pub fn sandbox_work_dir(&self) -> String {
        self.current_work_dir
            .as_deref()
            .and_then(|dir| self.mount.to_sandbox(dir).ok())
            .unwrap_or_else(|| self.mount.sandbox_root().to_string())
    }
}

/// Exclusive access to one tenant's sandbox.
pub struct SandboxLease {
    handle: OwnedMappedMutexGuard<Option<SandboxHandle>, SandboxHandle>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl SandboxLease {
    pub fn handle(&self) -> &SandboxHandle {
        &self.handle
    }

    /// Points the sandbox at `task_path` and makes sure the mapped directory
    /// exists inside the container. Returns the in-sandbox directory.
    ///
    /// A failing `mkdir` is logged and ignored: the host side already created
    /// the directory and the bind mount normally makes it visible.
    pub async fn set_work_dir(&mut self, task_path: &Path) -> Result<String, SandboxError> {
        let sandbox_dir = self.handle.mount.to_sandbox(task_path)?;
        self.handle.current_work_dir = Some(task_path.to_path_buf());

        let mkdir = vec!["mkdir".to_string(), "-p".to_string(), sandbox_dir.clone()];
        let root = self.handle.mount.sandbox_root().to_string();
        match self.runtime.exec(&self.handle.name, &mkdir, &root).await {
            Ok(out) if out.exit_code == 0 => {}
            Ok(out) => log::warn!(
                "mkdir {} in sandbox {} exited with {}: {}",
                sandbox_dir,
                self.handle.name,
                out.exit_code,
                out.output.trim()
            ),
            Err(e) => log::warn!(
                "Could not create {} in sandbox {}: {}",
                sandbox_dir,
                self.handle.name,
                e
            ),
        }

        Ok(sandbox_dir)
    }

    /// Runs `cmd` in the foreground from the current working directory.
    pub async fn exec(&mut self, cmd: &[String]) -> Result<ExecOutput, SandboxError> {
        let work_dir = self.handle.sandbox_work_dir();
        let result = self.runtime.exec(&self.handle.name, cmd, &work_dir).await;
        if result.is_err() {
            // Re-resolved by name on the next acquire.
            self.handle.alive = false;
        }
        result
    }
}

pub struct SandboxPool {
    runtime: Arc<dyn ContainerRuntime>,
    workspaces: Arc<WorkspaceAllocator>,
    settings: SandboxConfig,
    slots: Mutex<HashMap<String, Slot>>,
}

impl SandboxPool {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        workspaces: Arc<WorkspaceAllocator>,
        settings: SandboxConfig,
    ) -> Self {
        Self {
            runtime,
            workspaces,
            settings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic container name for a tenant.
    pub fn container_name(&self, user_id: &str) -> String {
        format!("{}-{}", self.settings.name_prefix, user_id)
    }

    /// Mount correspondence for a tenant: workspace root on the host, and
    /// `<mount_target>/<user_id>` inside the sandbox.
    pub fn mount_for(&self, user_id: &str) -> Result<MountMapping, SandboxError> {
        let host_root = self.workspaces.tenant_root(user_id)?;
        let sandbox_root = format!(
            "{}/{}",
            self.settings.mount_target.trim_end_matches('/'),
            user_id
        );
        Ok(MountMapping::new(host_root, sandbox_root))
    }

    fn slot(&self, user_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }

    /// Returns exclusive access to the tenant's sandbox, attaching to an
    /// existing container or creating one on first use.
    pub async fn acquire(&self, user_id: &str) -> Result<SandboxLease, SandboxError> {
        validate_identifier("user_id", user_id)?;

        let mut guard = self.slot(user_id).lock_owned().await;
        let needs_resolve = guard.as_ref().map(|h| !h.alive).unwrap_or(true);
        if needs_resolve {
            *guard = Some(self.attach_or_create(user_id).await?);
        }

        let handle = OwnedMutexGuard::try_map(guard, |slot| slot.as_mut()).map_err(|_| {
            SandboxError::container("acquire", self.container_name(user_id), "slot is empty")
        })?;

        Ok(SandboxLease {
            handle,
            runtime: self.runtime.clone(),
        })
    }

    async fn attach_or_create(&self, user_id: &str) -> Result<SandboxHandle, SandboxError> {
        self.runtime.ping().await?;

        let mount = self.mount_for(user_id)?;
        tokio::fs::create_dir_all(mount.host_root()).await?;

        let name = self.container_name(user_id);
        let info = match self.runtime.find(&name).await? {
            Some(info) => {
                if !info.running {
                    log::info!("Starting stopped sandbox {}", name);
                    self.runtime.start(&name).await?;
                }
                log::info!("Using existing sandbox {}", name);
                ContainerInfo {
                    running: true,
                    ..info
                }
            }
            None => {
                if !self.runtime.image_exists(&self.settings.image).await? {
                    return Err(SandboxError::ImageNotFound(self.settings.image.clone()));
                }
                let spec = ContainerSpec {
                    name: name.clone(),
                    image: self.settings.image.clone(),
                    binds: vec![mount.bind_spec()],
                    working_dir: mount.sandbox_root().to_string(),
                    command: self.settings.keepalive_command.clone(),
                    labels: vec![
                        ("coderun.managed".to_string(), "true".to_string()),
                        ("coderun.user_id".to_string(), user_id.to_string()),
                    ],
                };
                let info = self.runtime.create(&spec).await?;
                log::info!("Created sandbox {} from image {}", name, self.settings.image);
                info
            }
        };

        Ok(SandboxHandle {
            user_id: user_id.to_string(),
            name,
            container_id: info.id,
            image: self.settings.image.clone(),
            mount,
            current_work_dir: None,
            alive: info.running,
        })
    }

    /// Tears down the tenant's sandbox (when auto-remove is configured) and
    /// forgets it. A tenant this pool is not tracking is resolved by name.
    pub async fn release(&self, user_id: &str) -> Result<(), SandboxError> {
        validate_identifier("user_id", user_id)?;

        let slot = self.slot(user_id);
        let mut guard = slot.lock().await;
        let name = guard
            .take()
            .map(|h| h.name)
            .unwrap_or_else(|| self.container_name(user_id));

        if self.settings.auto_remove {
            self.runtime.stop_and_remove(&name).await?;
            log::info!("Stopped and removed sandbox {}", name);
        } else {
            log::info!("Released sandbox {} (left running)", name);
        }
        Ok(())
    }

    /// Releases every tenant this pool has tracked. All tenants are attempted;
    /// the first failure is returned.
    pub async fn release_all(&self) -> Result<(), SandboxError> {
        let tenants: Vec<String> = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.keys().cloned().collect()
        };

        let mut first_error = None;
        for user_id in tenants {
            if !self.is_tracked(&user_id).await {
                continue;
            }
            if let Err(e) = self.release(&user_id).await {
                log::error!("Failed to release sandbox for '{}': {}", user_id, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether the pool currently holds a sandbox for `user_id`.
    pub async fn is_tracked(&self, user_id: &str) -> bool {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.get(user_id).cloned()
        };
        match slot {
            Some(slot) => slot.lock().await.is_some(),
            None => false,
        }
    }
}
