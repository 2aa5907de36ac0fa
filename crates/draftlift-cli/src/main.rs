//! `draftlift`: scheduled draft-to-live promotion with git mirroring.

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use draftlift_core::config::{Layout, RuntimeConfig};
use draftlift_core::persistence::{JsonFileStore, JsonlAuditLog};
use draftlift_core::publish::PublishEngine;
use draftlift_core::schedule::{SubmitError, remove_task, submit_task_list};
use draftlift_core::scheduler::{SchedulerConfig, SchedulerDriver};
use draftlift_core::validate::validate_task_list;
use serde_json::Value;

#[derive(Parser)]
#[command(
    name = "draftlift",
    version,
    about = "Promote scheduled drafts to live projects and push them to git"
)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PathArgs {
    /// Installation root holding `data/`, `storage/drafts/` and `projects/`.
    #[arg(long, env = "DRAFTLIFT_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    #[arg(long, env = "DRAFTLIFT_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, env = "DRAFTLIFT_DRAFTS_DIR", global = true)]
    drafts_dir: Option<PathBuf>,

    #[arg(long, env = "DRAFTLIFT_PROJECTS_DIR", global = true)]
    projects_dir: Option<PathBuf>,

    /// git executable.
    #[arg(long, env = "DRAFTLIFT_GIT_BIN", default_value = "git", global = true)]
    git_bin: PathBuf,

    #[arg(long, env = "DRAFTLIFT_GIT_TIMEOUT_SECS", default_value_t = 30, global = true)]
    git_timeout_secs: u64,

    #[arg(long, env = "DRAFTLIFT_PUSH_TIMEOUT_SECS", default_value_t = 120, global = true)]
    push_timeout_secs: u64,

    /// Hosting API base URL.
    #[arg(long, env = "DRAFTLIFT_API_BASE", default_value = "https://api.github.com", global = true)]
    api_base: String,

    /// Credentials file, re-read at every scan. Defaults to `<root>/.env`.
    #[arg(long, env = "DRAFTLIFT_ENV_FILE", global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler until Ctrl-C. SIGUSR1 requests an immediate scan.
    Run {
        #[arg(long, env = "DRAFTLIFT_INTERVAL_SECS", default_value_t = 60)]
        interval_secs: u64,

        #[arg(long, env = "DRAFTLIFT_INITIAL_DELAY_SECS", default_value_t = 2)]
        initial_delay_secs: u64,
    },
    /// Run one scan now and print the report.
    Scan,
    /// Check a task list file without storing it.
    Validate { file: PathBuf },
    /// Validate and store a task list file.
    Submit { file: PathBuf },
    /// Remove an unpublished task by name.
    Remove { name: String },
    /// Print recent audit events, newest first.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let runtime = runtime_config(&cli.paths);

    match cli.command {
        Command::Run {
            interval_secs,
            initial_delay_secs,
        } => {
            let runtime = RuntimeConfig {
                scan_interval: Duration::from_secs(interval_secs),
                initial_delay: Duration::from_secs(initial_delay_secs),
                ..runtime
            };
            cmd_run(runtime).await
        }
        Command::Scan => cmd_scan(&runtime).await,
        Command::Validate { file } => cmd_validate(&file),
        Command::Submit { file } => cmd_submit(&runtime, &file),
        Command::Remove { name } => cmd_remove(&runtime, &name),
        Command::History { limit } => cmd_history(&runtime, limit),
    }
}

fn runtime_config(paths: &PathArgs) -> RuntimeConfig {
    let defaults = Layout::from_root(&paths.root);
    let layout = Layout {
        data_dir: paths.data_dir.clone().unwrap_or(defaults.data_dir),
        drafts_dir: paths.drafts_dir.clone().unwrap_or(defaults.drafts_dir),
        projects_dir: paths.projects_dir.clone().unwrap_or(defaults.projects_dir),
    };

    RuntimeConfig {
        git_program: paths.git_bin.clone(),
        git_local_timeout: Duration::from_secs(paths.git_timeout_secs.max(1)),
        git_push_timeout: Duration::from_secs(paths.push_timeout_secs.max(1)),
        api_base_url: paths.api_base.clone(),
        env_file: Some(
            paths
                .env_file
                .clone()
                .unwrap_or_else(|| paths.root.join(".env")),
        ),
        ..RuntimeConfig::new(layout)
    }
}

async fn cmd_run(runtime: RuntimeConfig) -> Result<()> {
    let engine = Arc::new(PublishEngine::from_runtime_config(&runtime));
    let driver = SchedulerDriver::new(engine, SchedulerConfig::from(&runtime));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut usr1 = signal(SignalKind::user_defined1()).context("install SIGUSR1 handler")?;
        let trigger = driver.clone();
        tokio::spawn(async move {
            while usr1.recv().await.is_some() {
                trigger.trigger();
            }
        });
    }

    driver
        .run(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %error, "ctrl-c handler failed, stopping");
            }
        })
        .await;
    Ok(())
}

async fn cmd_scan(runtime: &RuntimeConfig) -> Result<()> {
    let engine = PublishEngine::from_runtime_config(runtime);
    let report = engine.scan_and_publish().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.ok {
        bail!(
            "scan did not complete: {}",
            report
                .error
                .as_deref()
                .or(report.reason)
                .unwrap_or("unknown")
        );
    }
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let list = read_json(file)?;
    let report = validate_task_list(&list);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.ok {
        bail!("{} error(s) in {}", report.errors.len(), file.display());
    }
    Ok(())
}

fn cmd_submit(runtime: &RuntimeConfig, file: &Path) -> Result<()> {
    let list = read_json(file)?;
    let store = JsonFileStore::new(runtime.layout.data_dir.clone());
    let audit = JsonlAuditLog::new(runtime.layout.audit_log_path());

    match submit_task_list(&store, &audit, &list) {
        Ok(count) => {
            println!("stored {count} task(s)");
            Ok(())
        }
        Err(SubmitError::Invalid(report)) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            bail!("task list rejected");
        }
        Err(SubmitError::Storage(error)) => Err(error).context("store task list"),
    }
}

fn cmd_remove(runtime: &RuntimeConfig, name: &str) -> Result<()> {
    let store = JsonFileStore::new(runtime.layout.data_dir.clone());
    let audit = JsonlAuditLog::new(runtime.layout.audit_log_path());
    let removed = remove_task(&store, &audit, name)?;
    println!("removed {}", removed.display_name());
    Ok(())
}

fn cmd_history(runtime: &RuntimeConfig, limit: usize) -> Result<()> {
    let audit = JsonlAuditLog::new(runtime.layout.audit_log_path());
    for event in audit.read_recent(limit) {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
