// src/sandbox/docker.rs
use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::exec::{StartExecOptions, StartExecResults};
use bollard::models::{ContainerCreateBody, ExecConfig, HostConfig};
use bollard::query_parameters::{
    CreateContainerOptions as BollardCreateContainerOptionsQuery,
    InspectContainerOptions as BollardInspectContainerOptionsQuery,
    RemoveContainerOptionsBuilder,
    StartContainerOptions as BollardStartContainerOptionsQuery,
    StopContainerOptions as BollardStopContainerOptionsQuery,
};
use bollard::Docker;
use futures_util::stream::{Stream, StreamExt};
use std::collections::HashMap;
use std::default::Default;

use super::runtime::{ContainerInfo, ContainerRuntime, ContainerSpec, ExecOutput};
use crate::errors::SandboxError;

/// `ContainerRuntime` backed by the local Docker daemon.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            SandboxError::RuntimeUnavailable(format!("Failed to connect to Docker: {}", e))
        })?;
        Ok(Self { docker })
    }
}

fn is_not_found_error(error: &BollardError) -> bool {
    match error {
        BollardError::DockerResponseServerError { status_code, .. } => *status_code == 404,
        _ => false,
    }
}

/// Concatenates stdout, stderr and console frames and decodes them once.
/// Frames follow the process's write boundaries, which can split a multi-byte
/// character.
async fn collect_output<S>(mut stream: S) -> Result<String, BollardError>
where
    S: Stream<Item = Result<LogOutput, BollardError>> + Unpin,
{
    let mut bytes = Vec::new();
    while let Some(frame) = stream.next().await {
        match frame? {
            LogOutput::StdOut { message }
            | LogOutput::StdErr { message }
            | LogOutput::Console { message } => bytes.extend_from_slice(&message),
            _ => {}
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<(), SandboxError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| SandboxError::RuntimeUnavailable(format!("Docker ping failed: {}", e)))
    }

    async fn image_exists(&self, image: &str) -> Result<bool, SandboxError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found_error(&e) => Ok(false),
            Err(e) => Err(SandboxError::BollardError(e)),
        }
    }

    async fn find(&self, name: &str) -> Result<Option<ContainerInfo>, SandboxError> {
        match self
            .docker
            .inspect_container(name, None::<BollardInspectContainerOptionsQuery>)
            .await
        {
            Ok(response) => Ok(Some(ContainerInfo {
                id: response.id.unwrap_or_default(),
                name: name.to_string(),
                running: response
                    .state
                    .and_then(|state| state.running)
                    .unwrap_or(false),
            })),
            Err(e) if is_not_found_error(&e) => Ok(None),
            Err(e) => Err(SandboxError::container("inspect_container", name, e)),
        }
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerInfo, SandboxError> {
        let options = Some(BollardCreateContainerOptionsQuery {
            name: Some(spec.name.clone()),
            ..Default::default()
        });

        let labels: HashMap<String, String> = spec.labels.iter().cloned().collect();

        let config = ContainerCreateBody {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            working_dir: Some(spec.working_dir.clone()),
            labels: if labels.is_empty() { None } else { Some(labels) },
            host_config: Some(HostConfig {
                binds: Some(spec.binds.clone()),
                // Removal is explicit on release; the daemon must not race us for it.
                auto_remove: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container(options, config)
            .await
            .map_err(|e| SandboxError::container("create_container", &spec.name, e))?;
        self.docker
            .start_container(&container.id, None::<BollardStartContainerOptionsQuery>)
            .await
            .map_err(|e| SandboxError::container("start_container", &spec.name, e))?;

        Ok(ContainerInfo {
            id: container.id,
            name: spec.name.clone(),
            running: true,
        })
    }

    async fn start(&self, name: &str) -> Result<(), SandboxError> {
        self.docker
            .start_container(name, None::<BollardStartContainerOptionsQuery>)
            .await
            .map_err(|e| SandboxError::container("start_container", name, e))
    }

    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        working_dir: &str,
    ) -> Result<ExecOutput, SandboxError> {
        let config = ExecConfig {
            cmd: Some(cmd.to_vec()),
            working_dir: Some(working_dir.to_string()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(name, config)
            .await
            .map_err(|e| SandboxError::container("create_exec", name, e))?;

        let output = match self
            .docker
            .start_exec(&exec.id, None::<StartExecOptions>)
            .await
            .map_err(|e| SandboxError::container("start_exec", name, e))?
        {
            StartExecResults::Attached { output, .. } => collect_output(output)
                .await
                .map_err(|e| SandboxError::container("exec_output", name, e))?,
            StartExecResults::Detached => {
                return Err(SandboxError::container(
                    "start_exec",
                    name,
                    "exec started detached, output unavailable",
                ))
            }
        };

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| SandboxError::container("inspect_exec", name, e))?;
        let exit_code = inspect.exit_code.ok_or_else(|| {
            SandboxError::container("inspect_exec", name, "exec finished without an exit code")
        })?;

        Ok(ExecOutput { exit_code, output })
    }

    async fn stop_and_remove(&self, name: &str) -> Result<(), SandboxError> {
        if let Err(e) = self
            .docker
            .stop_container(name, None::<BollardStopContainerOptionsQuery>)
            .await
        {
            if !is_not_found_error(&e) {
                log::debug!("Stopping sandbox {} failed: {}", name, e);
            }
        }

        match self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptionsBuilder::new().force(true).v(true).build()),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_found_error(&e) => Ok(()),
            Err(e) => Err(SandboxError::container("remove_container", name, e)),
        }
    }
}
