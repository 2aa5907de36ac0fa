use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

use crate::slug::slugify;
use crate::timestamp;

/// One draft-to-live promotion unit as persisted in the task list.
///
/// Fields the pipeline does not interpret are kept in `extra` so a whole-list
/// rewrite never drops data written by the ingestion side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTask {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_path: Option<String>,
    #[serde(default, alias = "publish_at", skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<String>,
    #[serde(default, alias = "published_at")]
    pub published_at: Option<String>,
    #[serde(
        default,
        alias = "gitRepoPrivate",
        skip_serializing_if = "Option::is_none"
    )]
    pub repo_visibility: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RepoVisibility {
    Default,
    Private,
    Public,
}

impl RepoVisibility {
    pub fn is_private(self, default_private: bool) -> bool {
        match self {
            Self::Default => default_private,
            Self::Private => true,
            Self::Public => false,
        }
    }
}

impl From<Option<bool>> for RepoVisibility {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Default,
            Some(true) => Self::Private,
            Some(false) => Self::Public,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskState {
    /// `publishAt` is missing or does not parse; the scanner never promotes it.
    Unscheduled,
    Waiting { due_in: Duration },
    Due,
    Published,
}

impl PublishTask {
    pub fn new(
        name: impl Into<String>,
        draft_path: impl Into<String>,
        live_path: impl Into<String>,
        publish_at: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            draft_path: Some(draft_path.into()),
            live_path: Some(live_path.into()),
            publish_at: Some(publish_at.into()),
            ..Self::default()
        }
    }

    /// The name used for logs, audit records and the slug. Falls back to the
    /// last segment of the live or draft path when the row has no name.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if !name.is_empty() {
            return name.to_string();
        }

        [self.live_path.as_deref(), self.draft_path.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|path| !path.is_empty())
            .and_then(|path| Path::new(path).file_name())
            .map(|segment| segment.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn slug(&self) -> String {
        slugify(&self.display_name())
    }

    pub fn is_published(&self) -> bool {
        self.published_at
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }

    pub fn publish_instant(&self) -> Option<OffsetDateTime> {
        self.publish_at.as_deref().and_then(timestamp::parse_instant)
    }

    pub fn visibility(&self) -> RepoVisibility {
        RepoVisibility::from(self.repo_visibility)
    }

    pub fn state_at(&self, now: OffsetDateTime) -> TaskState {
        if self.is_published() {
            return TaskState::Published;
        }

        match self.publish_instant() {
            None => TaskState::Unscheduled,
            Some(due) if due <= now => TaskState::Due,
            Some(due) => TaskState::Waiting { due_in: due - now },
        }
    }
}

/// A persisted task list row. Rows that do not decode as a [`PublishTask`]
/// are carried verbatim so a rewrite of the list never drops them.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskRow {
    Task(PublishTask),
    Unreadable(Value),
}

impl TaskRow {
    pub fn decode(value: Value) -> Result<Self, (Value, serde_json::Error)> {
        match PublishTask::deserialize(&value) {
            Ok(task) => Ok(Self::Task(task)),
            Err(error) => Err((value, error)),
        }
    }

    pub fn as_task(&self) -> Option<&PublishTask> {
        match self {
            Self::Task(task) => Some(task),
            Self::Unreadable(_) => None,
        }
    }

    pub fn into_task(self) -> Option<PublishTask> {
        match self {
            Self::Task(task) => Some(task),
            Self::Unreadable(_) => None,
        }
    }
}

impl From<PublishTask> for TaskRow {
    fn from(task: PublishTask) -> Self {
        Self::Task(task)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn accepts_legacy_field_spellings_and_keeps_unknown_fields() {
        let raw = r#"{
            "name": "Demo",
            "draftPath": "drafts/demo",
            "livePath": "projects/demo",
            "publish_at": "2025-09-11T14:30:00Z",
            "published_at": null,
            "gitRepoPrivate": true,
            "uploadedBy": "ops"
        }"#;

        let task: PublishTask = serde_json::from_str(raw).expect("row should parse");
        assert_eq!(task.publish_at.as_deref(), Some("2025-09-11T14:30:00Z"));
        assert_eq!(task.visibility(), RepoVisibility::Private);
        assert_eq!(task.extra.get("uploadedBy"), Some(&Value::from("ops")));

        let written = serde_json::to_value(&task).expect("row should serialize");
        assert_eq!(written["publishAt"], "2025-09-11T14:30:00Z");
        assert_eq!(written["repoVisibility"], true);
        assert_eq!(written["uploadedBy"], "ops");
    }

    #[test]
    fn state_follows_publish_times() {
        let now = datetime!(2025-09-11 14:30:00 UTC);
        let mut task = PublishTask::new("demo", "drafts/demo", "projects/demo", "2025-09-11T14:29:00Z");
        assert_eq!(task.state_at(now), TaskState::Due);

        task.publish_at = Some("2025-09-11T15:30:00Z".to_string());
        assert_eq!(
            task.state_at(now),
            TaskState::Waiting {
                due_in: Duration::hours(1)
            }
        );

        task.publish_at = Some("tomorrow".to_string());
        assert_eq!(task.state_at(now), TaskState::Unscheduled);

        task.published_at = Some("2025-09-11T14:00:00.000Z".to_string());
        assert_eq!(task.state_at(now), TaskState::Published);
    }

    #[test]
    fn rows_that_do_not_decode_are_carried_verbatim() {
        let both_spellings = serde_json::json!({
            "name": "twice",
            "publishAt": "2025-09-11T14:30:00Z",
            "publish_at": "2025-09-12T14:30:00Z"
        });
        let (kept, _) = TaskRow::decode(both_spellings.clone()).expect_err("duplicate alias");
        assert_eq!(kept, both_spellings);

        let row = TaskRow::Unreadable(serde_json::json!({ "name": 7, "note": "legacy" }));
        assert!(row.as_task().is_none());
        assert_eq!(
            serde_json::to_value(&row).expect("serialize"),
            serde_json::json!({ "name": 7, "note": "legacy" })
        );

        let decoded = TaskRow::decode(serde_json::json!({ "name": "ok" })).expect("decodes");
        assert_eq!(decoded.into_task().map(|task| task.name), Some("ok".to_string()));
    }

    #[test]
    fn display_name_falls_back_to_path_segment() {
        let task = PublishTask {
            live_path: Some("projects/My Site".to_string()),
            ..PublishTask::default()
        };
        assert_eq!(task.display_name(), "My Site");
        assert_eq!(task.slug(), "my-site");
    }
}
