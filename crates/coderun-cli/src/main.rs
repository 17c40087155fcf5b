use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coderun_core::config::{CoderunConfig, ConfigLoader};
use coderun_core::workspace::WorkspaceAllocator;
use coderun_core::{create_executor, CodeExecutor, DockerRuntime, ExecutionRequest, SandboxPool};
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(
    name = "coderun",
    author,
    version = "0.1.0",
    about = "Run agent-authored code in per-user sandboxes"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, help = "Path to a YAML configuration file")]
    config: Option<PathBuf>,

    #[clap(long, short, help = "Log level (overrides logging.level from the config)")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute code for a user and print the result envelope as JSON
    Run {
        #[clap(long)]
        user: String,

        #[clap(long, default_value = "", help = "Task to continue; omit to start a new one")]
        task: String,

        #[clap(long, help = "python, sh, bash or shell")]
        language: String,

        #[clap(long, conflicts_with = "file", help = "Code to run")]
        code: Option<String>,

        #[clap(long, help = "Read the code from a file")]
        file: Option<PathBuf>,
    },
    /// Allocate a task directory and print its path
    Workspace {
        #[clap(long)]
        user: String,

        #[clap(long)]
        task: String,
    },
    /// List a user's task directories, or print one task's path
    Tasks {
        #[clap(long)]
        user: String,

        #[clap(long)]
        task: Option<String>,
    },
    /// Stop and remove a user's sandbox container
    Release {
        #[clap(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str())
        .parse()
        .unwrap_or(LevelFilter::Info);
    // Logs go to stderr so stdout carries only the result.
    env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Commands::Run {
            user,
            task,
            language,
            code,
            file,
        } => {
            let code = match (code, file) {
                (Some(code), _) => code,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => bail!("Either --code or --file is required"),
            };
            run(&config, ExecutionRequest::new(code, language, user, task)).await
        }
        Commands::Workspace { user, task } => {
            let executor = create_executor(&config)?;
            let path = executor.allocate_workspace(&user, &task).await?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Tasks { user, task } => tasks(&config, &user, task.as_deref()).await,
        Commands::Release { user } => release(&config, &user).await,
    }
}

async fn run(config: &CoderunConfig, request: ExecutionRequest) -> Result<()> {
    let executor = create_executor(config)?;
    let result = executor.execute(&request).await?;
    println!("{}", result.to_json());

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn tasks(config: &CoderunConfig, user_id: &str, task_id: Option<&str>) -> Result<()> {
    let workspaces = WorkspaceAllocator::new(config.workspace.root.clone());

    match task_id {
        Some(task_id) => match workspaces.lookup(user_id, task_id).await? {
            Some(path) => println!("{}", path.display()),
            None => bail!("No task '{}' for user '{}'", task_id, user_id),
        },
        None => {
            for task in workspaces.tasks(user_id).await? {
                println!("{}", task);
            }
        }
    }
    Ok(())
}

async fn release(config: &CoderunConfig, user_id: &str) -> Result<()> {
    let runtime = Arc::new(DockerRuntime::connect()?);
    let workspaces = Arc::new(WorkspaceAllocator::new(config.workspace.root.clone()));
    let pool = SandboxPool::new(runtime, workspaces, config.sandbox.clone());

    pool.release(user_id).await?;
    println!("Released sandbox {}", pool.container_name(user_id));
    Ok(())
}
