//! Host ↔ sandbox path correspondence for a tenant's bind mount

use crate::errors::SandboxError;
use std::path::{Component, Path, PathBuf};

/// One bind mount: `host_root` on the host appears at `sandbox_root` inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountMapping {
    host_root: PathBuf,
    sandbox_root: String,
}

impl MountMapping {
    pub fn new(host_root: impl Into<PathBuf>, sandbox_root: impl Into<String>) -> Self {
        let sandbox_root: String = sandbox_root.into();
        let trimmed = sandbox_root.trim_end_matches('/');
        Self {
            host_root: host_root.into(),
            sandbox_root: if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            },
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    pub fn sandbox_root(&self) -> &str {
        &self.sandbox_root
    }

    /// Docker bind specification, `host:container:rw`.
    pub fn bind_spec(&self) -> String {
        format!("{}:{}:rw", self.host_root.display(), self.sandbox_root)
    }

    /// Translates a host path under the mount into the path seen inside the sandbox.
    pub fn to_sandbox(&self, host_path: &Path) -> Result<String, SandboxError> {
        let relative = host_path
            .strip_prefix(&self.host_root)
            .map_err(|_| self.outside(host_path.display().to_string()))?;

        let mut mapped = self.sandbox_root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| self.outside(host_path.display().to_string()))?;
                    if !mapped.ends_with('/') {
                        mapped.push('/');
                    }
                    mapped.push_str(part);
                }
                Component::CurDir => {}
                _ => return Err(self.outside(host_path.display().to_string())),
            }
        }
        Ok(mapped)
    }

    /// Translates a sandbox path under the mount back to the host.
    pub fn to_host(&self, sandbox_path: &str) -> Result<PathBuf, SandboxError> {
        let relative = if sandbox_path == self.sandbox_root {
            ""
        } else if self.sandbox_root == "/" {
            sandbox_path
                .strip_prefix('/')
                .ok_or_else(|| self.outside(sandbox_path.to_string()))?
        } else {
            sandbox_path
                .strip_prefix(self.sandbox_root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .ok_or_else(|| self.outside(sandbox_path.to_string()))?
        };

        let mut host = self.host_root.clone();
        for part in relative.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if part == ".." {
                return Err(self.outside(sandbox_path.to_string()));
            }
            host.push(part);
        }
        Ok(host)
    }

    fn outside(&self, path: String) -> SandboxError {
        SandboxError::PathOutsideMount {
            path,
            mount: self.sandbox_root.clone(),
        }
    }
}
