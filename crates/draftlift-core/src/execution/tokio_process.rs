use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::io::AsyncReadExt;

use crate::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessWaitFuture, RunningProcess,
};
use crate::models::{CoreError, CoreErrorKind, PublishStage};

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let mut cmd = tokio::process::Command::new(&request.command.program);
        cmd.args(&request.command.args);

        for (key, value) in &request.command.env {
            cmd.env(key, value);
        }

        if let Some(dir) = &request.command.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|error| {
            process_failure(
                request.stage,
                request.task.as_deref(),
                format!(
                    "failed to spawn '{}': {error}",
                    request.command.program.display()
                ),
            )
        })?;

        let pid = child.id();
        let started_at = SystemTime::now();

        Ok(Box::new(TokioRunningProcess {
            child: Mutex::new(Some(child)),
            pid,
            started_at,
            timeout: request.timeout,
            stage: request.stage,
            task: request.task,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<tokio::process::Child>>,
    pid: Option<u32>,
    started_at: SystemTime,
    timeout: Option<Duration>,
    stage: PublishStage,
    task: Option<String>,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let child = self.child.into_inner().ok().flatten();
        let timeout = self.timeout;
        let started_at = self.started_at;
        let stage = self.stage;
        let task = self.task;
        let pid = self.pid;

        Box::pin(async move {
            let mut child = child.ok_or_else(|| {
                process_failure(
                    stage,
                    task.as_deref(),
                    "child process already consumed".to_string(),
                )
            })?;

            let stdout_reader = {
                let mut stdout = child.stdout.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stdout.take() {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };
            let stderr_reader = {
                let mut stderr = child.stderr.take();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    if let Some(mut handle) = stderr.take() {
                        let _ = handle.read_to_end(&mut buffer).await;
                    }
                    buffer
                })
            };

            let wait_err = |error: std::io::Error| {
                process_failure(
                    stage,
                    task.as_deref(),
                    format!("failed to wait for process: {error}"),
                )
            };

            // Output is collected after exit with a bounded read window; credential
            // helpers spawned by git can keep the pipes open past the parent.
            let status = if let Some(timeout_duration) = timeout {
                match tokio::time::timeout(timeout_duration, child.wait()).await {
                    Ok(result) => result.map_err(wait_err)?,
                    Err(_) => {
                        kill_process_group(pid, &mut child);
                        let _ = tokio::time::timeout(Duration::from_secs(1), child.wait()).await;
                        stdout_reader.abort();
                        stderr_reader.abort();

                        let mut error = CoreError::new(
                            CoreErrorKind::Timeout,
                            format!("process timed out after {}ms", timeout_duration.as_millis()),
                        )
                        .stage(stage);
                        error.task = task.clone();
                        return Err(error);
                    }
                }
            } else {
                child.wait().await.map_err(wait_err)?
            };

            let read_deadline = Duration::from_millis(250);
            let stdout = match tokio::time::timeout(read_deadline, stdout_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };
            let stderr = match tokio::time::timeout(read_deadline, stderr_reader).await {
                Ok(Ok(buffer)) => buffer,
                _ => Vec::new(),
            };

            let finished_at = SystemTime::now();

            let status = match status.code() {
                Some(code) => ProcessExitStatus::ExitCode(code),
                None => ProcessExitStatus::Terminated,
            };

            Ok(ProcessOutput {
                status,
                stdout,
                stderr,
                started_at,
                finished_at,
            })
        })
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>, _child: &mut tokio::process::Child) {
    if let Some(pid) = pid {
        let pgid = -(pid as libc::pid_t);
        unsafe {
            libc::kill(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>, child: &mut tokio::process::Child) {
    let _ = child.start_kill();
}

fn process_failure(stage: PublishStage, task: Option<&str>, message: String) -> CoreError {
    let error = CoreError::new(CoreErrorKind::ProcessFailure, message).stage(stage);
    match task {
        Some(task) => error.task(task),
        None => error,
    }
}
