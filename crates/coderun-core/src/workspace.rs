//! Per-tenant, per-task workspace directories on the host
//!
//! Layout is `<root>/<user_id>/<task_id>/`. A tenant's root is bind-mounted into
//! that tenant's sandbox, so every task directory is visible inside the
//! container as well. Directories are never removed here; keeping them lets a
//! tenant resume work in the same task later.

use crate::errors::SandboxError;
use regex::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::OnceLock;
use tokio::fs;
use uuid::Uuid;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,127}$").expect("identifier pattern is valid")
    })
}

/// Checks that a tenant or task identifier is safe to use as a single path
/// component and as part of a container name.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), SandboxError> {
    if identifier_pattern().is_match(value) {
        Ok(())
    } else {
        Err(SandboxError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Short random task identifier for requests that arrive without one.
pub fn generate_task_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub struct WorkspaceAllocator {
    root: PathBuf,
}

impl WorkspaceAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Host directory that backs every task of `user_id`.
    pub fn tenant_root(&self, user_id: &str) -> Result<PathBuf, SandboxError> {
        validate_identifier("user_id", user_id)?;
        Ok(self.root.join(user_id))
    }

    /// Returns the task directory, creating it (and the tenant root) if needed.
    ///
    /// Calling this again for the same pair returns the same path; existing
    /// contents are left untouched.
    pub async fn allocate(&self, user_id: &str, task_id: &str) -> Result<PathBuf, SandboxError> {
        validate_identifier("user_id", user_id)?;
        validate_identifier("task_id", task_id)?;

        let task_dir = self.root.join(user_id).join(task_id);
        if !fs::try_exists(&task_dir).await? {
            fs::create_dir_all(&task_dir).await?;
            log::debug!(
                "Allocated workspace for user '{}' task '{}': {}",
                user_id,
                task_id,
                task_dir.display()
            );
        }

        Ok(task_dir)
    }

    /// Path of an existing task directory, whichever process created it.
    pub async fn lookup(
        &self,
        user_id: &str,
        task_id: &str,
    ) -> Result<Option<PathBuf>, SandboxError> {
        validate_identifier("task_id", task_id)?;
        let task_dir = self.tenant_root(user_id)?.join(task_id);
        match fs::metadata(&task_dir).await {
            Ok(meta) if meta.is_dir() => Ok(Some(task_dir)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Task identifiers that have a directory under the tenant root, sorted.
    pub async fn tasks(&self, user_id: &str) -> Result<Vec<String>, SandboxError> {
        let tenant_root = self.tenant_root(user_id)?;
        let mut entries = match fs::read_dir(&tenant_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if identifier_pattern().is_match(name) {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
