pub mod tokio_process;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{CoreError, CoreErrorKind, PublishStage};

pub use tokio_process::TokioProcessExecutor;

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn validate(&self, stage: PublishStage) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input(stage, "command program path must not be empty"));
        }

        if self.args.iter().any(|arg| arg.contains('\0')) {
            return Err(invalid_input(stage, "command args must not contain NUL bytes"));
        }

        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || key.contains('\0') || value.contains('\0'))
        {
            return Err(invalid_input(
                stage,
                "environment keys must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub stage: PublishStage,
    pub task: Option<String>,
    pub command: CommandSpec,
    pub timeout: Option<Duration>,
}

impl ProcessSpawnRequest {
    pub fn new(stage: PublishStage, command: CommandSpec) -> Self {
        Self {
            stage,
            task: None,
            command,
            timeout: None,
        }
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command.validate(self.stage)?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(invalid_input(
                self.stage,
                "timeout must be greater than zero when provided",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl ProcessOutput {
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ProcessExitStatus::ExitCode(code) => Some(code),
            ProcessExitStatus::Terminated => None,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }
}

pub trait RunningProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn wait(self: Box<Self>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}

fn invalid_input(stage: PublishStage, message: &str) -> CoreError {
    CoreError::new(CoreErrorKind::InvalidInput, message).stage(stage)
}
