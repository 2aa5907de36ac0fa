use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timestamp;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    PublishOk,
    PublishSkipMissing,
    PublishFailGit,
    PublishError,
    GitPushOk,
    GitPushFail,
    GitRepoCreated,
    ScheduleSet,
    ScheduleSetError,
    TaskRemoved,
    #[serde(other)]
    Other,
}

/// One line of the audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub ts: String,
    pub event: AuditEventKind,
    #[serde(default)]
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event: AuditEventKind, payload: Value) -> Self {
        Self {
            ts: timestamp::now_utc(),
            event,
            payload,
        }
    }
}
