pub mod audit_log;
pub mod json_store;

use crate::models::{AppConfig, AuditEvent, CoreError, PublishTask, TaskRow};

pub use audit_log::JsonlAuditLog;
pub use json_store::JsonFileStore;

pub type PersistenceResult<T> = Result<T, CoreError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StoreKind {
    TaskList,
    Config,
}

impl StoreKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::TaskList => "schedule.json",
            Self::Config => "admin-config.json",
        }
    }
}

pub const AUDIT_LOG_FILE: &str = "audit.jsonl";

pub trait TaskListStore: Send + Sync {
    /// Missing, empty or corrupt storage loads as an empty list. Rows that do
    /// not decode come back as [`TaskRow::Unreadable`].
    fn load_rows(&self) -> PersistenceResult<Vec<TaskRow>>;

    fn save_rows(&self, rows: &[TaskRow]) -> PersistenceResult<()>;

    /// Decoded rows only.
    fn load_tasks(&self) -> PersistenceResult<Vec<PublishTask>> {
        Ok(self
            .load_rows()?
            .into_iter()
            .filter_map(TaskRow::into_task)
            .collect())
    }

    /// Replaces the whole list with `tasks`.
    fn save_tasks(&self, tasks: &[PublishTask]) -> PersistenceResult<()> {
        let rows: Vec<TaskRow> = tasks.iter().cloned().map(TaskRow::from).collect();
        self.save_rows(&rows)
    }
}

pub trait ConfigStore: Send + Sync {
    fn load_config(&self) -> PersistenceResult<AppConfig>;

    fn save_config(&self, config: &AppConfig) -> PersistenceResult<()>;
}

/// Append-only event sink. Implementations swallow and log their own failures.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent);
}
