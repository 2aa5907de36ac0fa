use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::execution::{CommandSpec, ProcessExecutor, ProcessSpawnRequest, spawn_validated};
use crate::models::PublishStage;
use crate::redact::Redactor;

pub const DEFAULT_LOCAL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one git invocation. Spawn failures and timeouts have no exit
/// code and carry their message in `stderr`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GitCommandResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitCommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn not_run(message: String) -> Self {
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr: message,
        }
    }

    /// Trimmed stderr, falling back to stdout, for diagnostics.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
    Failed,
}

pub fn interpret_commit(result: &GitCommandResult) -> CommitOutcome {
    if result.success() {
        return CommitOutcome::Committed;
    }

    let says_clean = |text: &str| text.to_ascii_lowercase().contains("nothing to commit");
    if says_clean(&result.stdout) || says_clean(&result.stderr) {
        CommitOutcome::NothingToCommit
    } else {
        CommitOutcome::Failed
    }
}

pub struct GitRunner {
    executor: Arc<dyn ProcessExecutor>,
    program: PathBuf,
    local_timeout: Duration,
    push_timeout: Duration,
}

impl GitRunner {
    pub fn new(executor: Arc<dyn ProcessExecutor>, program: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            program: program.into(),
            local_timeout: DEFAULT_LOCAL_TIMEOUT,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }

    pub fn timeouts(mut self, local: Duration, push: Duration) -> Self {
        self.local_timeout = local;
        self.push_timeout = push;
        self
    }

    pub async fn run(
        &self,
        stage: PublishStage,
        task: &str,
        cwd: &Path,
        args: &[String],
        redactor: &Redactor,
    ) -> GitCommandResult {
        let timeout = if stage == PublishStage::Push {
            self.push_timeout
        } else {
            self.local_timeout
        };
        let command = CommandSpec::new(&self.program)
            .args(args.iter().cloned())
            .env("GIT_TERMINAL_PROMPT", "0")
            .working_dir(cwd);
        let request = ProcessSpawnRequest::new(stage, command)
            .task(task)
            .timeout(timeout);

        let result = match spawn_validated(self.executor.as_ref(), request) {
            Ok(process) => {
                tracing::trace!(task, stage = %stage, pid = ?process.pid(), "git spawned");
                match process.wait().await {
                    Ok(output) => GitCommandResult {
                        exit_code: output.exit_code(),
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    },
                    Err(error) => GitCommandResult::not_run(error.message),
                }
            }
            Err(error) => GitCommandResult::not_run(error.message),
        };

        if result.success() {
            tracing::debug!(
                task,
                stage = %stage,
                args = ?redactor.redact_args(args),
                "git command succeeded"
            );
        } else {
            tracing::warn!(
                task,
                stage = %stage,
                args = ?redactor.redact_args(args),
                exit_code = ?result.exit_code,
                stderr = %redactor.redact(result.stderr.trim()),
                "git command failed"
            );
        }

        result
    }
}
