//! Turning submitted code text into a script file on disk

use super::Language;
use crate::config::InterpreterConfig;
use crate::errors::SandboxError;
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use tempfile::{Builder, TempPath};

fn opening_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"^\s*```[\w+.-]*[ \t]*(\r?\n|$)").expect("fence pattern is valid"))
}

fn closing_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(^|\r?\n)[ \t]*```\s*$").expect("fence pattern is valid"))
}

/// Removes a Markdown code fence wrapped around the code, e.g.
/// "```python\nprint(1)\n```". Code without a fence is returned unchanged.
pub fn strip_code_fences(code: &str) -> String {
    let Some(open) = opening_fence().find(code) else {
        return code.to_string();
    };
    let body = &code[open.end()..];
    match closing_fence().find(body) {
        Some(close) => body[..close.start()].to_string(),
        None => body.to_string(),
    }
}

/// Command that runs `script_path` for `language`.
pub fn invocation(
    language: Language,
    interpreters: &InterpreterConfig,
    script_path: &str,
) -> Vec<String> {
    let interpreter = match language {
        Language::Python => &interpreters.python,
        Language::Shell => &interpreters.shell,
    };
    vec![interpreter.clone(), script_path.to_string()]
}

/// A script written into a task directory. Dropping it deletes the file.
pub struct Artifact {
    path: TempPath,
}

impl Artifact {
    /// Writes `code` to a uniquely named file in `dir`.
    pub fn materialize(dir: &Path, language: Language, code: &str) -> Result<Self, SandboxError> {
        let mut file = Builder::new()
            .prefix("exec_")
            .suffix(language.extension())
            .tempfile_in(dir)?;
        file.write_all(code.as_bytes())?;
        file.flush()?;

        // The sandbox may run as a different uid than the host process.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = if language.needs_exec_permission() { 0o755 } else { 0o644 };
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(mode))?;
        }

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file. Failures are logged, never returned.
    pub fn cleanup(self) {
        let display = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            if e.kind() == std::io::ErrorKind::NotFound {
                log::debug!("Artifact {} was already removed", display);
            } else {
                log::warn!("Failed to remove artifact {}: {}", display, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_strip_language_fence() {
        assert_eq!(strip_code_fences("```python\nprint('hi')\n```"), "print('hi')");
        assert_eq!(strip_code_fences("```bash\necho hi\n```\n"), "echo hi");
        assert_eq!(strip_code_fences("  ```sh\r\nls\r\n```  "), "ls");
    }

    #[test]
    fn test_strip_bare_fence_and_unterminated_fence() {
        assert_eq!(strip_code_fences("```\nx = 1\ny = 2\n```"), "x = 1\ny = 2");
        assert_eq!(strip_code_fences("```python\nprint(1)\n"), "print(1)\n");
    }

    #[test]
    fn test_code_without_fence_is_untouched() {
        let code = "s = \"```\"\nprint(s)\n";
        assert_eq!(strip_code_fences(code), code);
        assert_eq!(strip_code_fences(""), "");
    }

    #[test]
    fn test_invocation() {
        let interpreters = InterpreterConfig::default();
        assert_eq!(
            invocation(Language::Python, &interpreters, "/w/a/t/exec_1.py"),
            vec!["python", "/w/a/t/exec_1.py"]
        );
        assert_eq!(
            invocation(Language::Shell, &interpreters, "/w/a/t/exec_1.sh"),
            vec!["sh", "/w/a/t/exec_1.sh"]
        );
    }

    #[test]
    fn test_materialize_and_cleanup() {
        let dir = tempdir().unwrap();
        let artifact = Artifact::materialize(dir.path(), Language::Shell, "echo hi\n").unwrap();
        let path = artifact.path().to_path_buf();

        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("exec_"));
        assert_eq!(path.extension().unwrap(), "sh");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "echo hi\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        artifact.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let artifact = Artifact::materialize(dir.path(), Language::Python, "pass").unwrap();
        std::fs::remove_file(artifact.path()).unwrap();
        artifact.cleanup();
    }
}
