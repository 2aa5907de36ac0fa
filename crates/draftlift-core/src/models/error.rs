use crate::models::PublishStage;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    InvalidInput,
    SourceMissing,
    StorageFailure,
    ProcessFailure,
    Timeout,
    RemoteFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub task: Option<String>,
    pub stage: Option<PublishStage>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            task: None,
            stage: None,
            kind,
            message: message.into(),
        }
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn stage(mut self, stage: PublishStage) -> Self {
        self.stage = Some(stage);
        self
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
