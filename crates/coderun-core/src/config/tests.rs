//! Tests for YAML loading, defaults and environment overrides

#[cfg(test)]
mod tests {
    use super::super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn clear_env() {
        env::remove_var(ENV_WORKSPACE_ROOT);
        env::remove_var(ENV_IMAGE);
        env::remove_var(ENV_BACKEND);
    }

    #[test]
    #[serial]
    fn test_empty_document_uses_defaults() {
        clear_env();
        let config = ConfigLoader::from_str("").unwrap();

        assert_eq!(config.backend, ExecutionBackend::Docker);
        assert_eq!(config.sandbox.image, "python-data-analysis:3.11");
        assert_eq!(config.sandbox.name_prefix, "coderun-executor");
        assert_eq!(config.sandbox.mount_target, "/workspace/tasks");
        assert!(config.sandbox.auto_remove);
        assert_eq!(config.sandbox.keepalive_command, vec!["tail", "-f", "/dev/null"]);
        assert_eq!(config.interpreters.python, "python");
        assert_eq!(config.interpreters.shell, "sh");
        assert_eq!(config.logging.level, "info");
        assert!(config.workspace.root.ends_with(".coderun/workspace/tasks"));
    }

    #[test]
    #[serial]
    fn test_partial_yaml_keeps_other_defaults() {
        clear_env();
        let yaml = r#"
backend: local
workspace:
  root: /srv/coderun
sandbox:
  image: python:3.12-slim
  auto_remove: false
interpreters:
  python: python3
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();

        assert_eq!(config.backend, ExecutionBackend::Local);
        assert_eq!(config.workspace.root, PathBuf::from("/srv/coderun"));
        assert_eq!(config.sandbox.image, "python:3.12-slim");
        assert!(!config.sandbox.auto_remove);
        assert_eq!(config.sandbox.name_prefix, "coderun-executor");
        assert_eq!(config.interpreters.python, "python3");
        assert_eq!(config.interpreters.shell, "sh");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        env::set_var(ENV_WORKSPACE_ROOT, "/tmp/override-root");
        env::set_var(ENV_IMAGE, "alpine:3.20");
        env::set_var(ENV_BACKEND, "LOCAL");

        let config = ConfigLoader::from_str("sandbox:\n  image: ignored:1\n");
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.workspace.root, PathBuf::from("/tmp/override-root"));
        assert_eq!(config.sandbox.image, "alpine:3.20");
        assert_eq!(config.backend, ExecutionBackend::Local);
    }

    #[test]
    #[serial]
    fn test_unknown_backend_in_environment_is_rejected() {
        clear_env();
        env::set_var(ENV_BACKEND, "kubernetes");
        let result = ConfigLoader::from_str("");
        clear_env();

        let err = result.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("kubernetes"));
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_values() {
        clear_env();
        let relative_mount = ConfigLoader::from_str("sandbox:\n  mount_target: tasks\n");
        assert!(relative_mount.is_err());

        let empty_image = ConfigLoader::from_str("sandbox:\n  image: \"\"\n");
        assert!(empty_image.is_err());

        let empty_keepalive = ConfigLoader::from_str("sandbox:\n  keepalive_command: []\n");
        assert!(empty_keepalive.is_err());

        let empty_python = ConfigLoader::from_str("interpreters:\n  python: \"\"\n");
        assert!(empty_python.is_err());
    }

    #[test]
    #[serial]
    fn test_relative_workspace_root_is_made_absolute() {
        clear_env();
        let config = ConfigLoader::from_str("workspace:\n  root: ./tasks\n").unwrap();

        assert!(config.workspace.root.is_absolute());
        assert_eq!(
            config.workspace.root,
            env::current_dir().unwrap().join("tasks")
        );

        env::set_var(ENV_WORKSPACE_ROOT, "relative/root");
        let from_env = ConfigLoader::from_str("");
        clear_env();
        assert_eq!(
            from_env.unwrap().workspace.root,
            env::current_dir().unwrap().join("relative").join("root")
        );
    }

    #[test]
    fn test_validate_rejects_relative_workspace_root() {
        let mut config = CoderunConfig::default();
        config.workspace.root = PathBuf::from("tasks");

        let err = validate_config(&config).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("workspace.root must be an absolute path"));
    }

    #[test]
    #[serial]
    fn test_malformed_yaml() {
        clear_env();
        let err = ConfigLoader::from_str("sandbox: [unclosed").unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }

    #[tokio::test]
    #[serial]
    async fn test_load_config_from_file() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sandbox:\n  name_prefix: tenant-box\nlogging:\n  level: debug").unwrap();

        let config = load_config(file.path()).await.unwrap();
        assert_eq!(config.sandbox.name_prefix, "tenant-box");
        assert_eq!(config.logging.level, "debug");
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_file_is_config_error() {
        clear_env();
        let err = load_config("/definitely/not/here.yaml").await.unwrap_err();
        assert!(err.is_fatal());
    }
}
