pub mod audit;
pub mod error;
pub mod git_config;
pub mod stage;
pub mod task;

pub use audit::{AuditEvent, AuditEventKind};
pub use error::{CoreError, CoreErrorKind, CoreResult};
pub use git_config::{AppConfig, AuthMode, Credentials, GitConfig, GitSettings};
pub use stage::PublishStage;
pub use task::{PublishTask, RepoVisibility, TaskRow, TaskState};
