use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::{AuditEvent, AuditEventKind, CoreError, CoreErrorKind, CoreResult, PublishTask};
use crate::persistence::{AuditSink, TaskListStore};
use crate::validate::{ValidationIssue, ValidationReport, validate_task_list};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("task list rejected with {} error(s)", .0.errors.len())]
    Invalid(ValidationReport),
    #[error(transparent)]
    Storage(#[from] CoreError),
}

/// Validates and persists a caller-submitted task list as one unit.
/// Returns the number of rows stored.
pub fn submit_task_list(
    store: &dyn TaskListStore,
    audit: &dyn AuditSink,
    list: &Value,
) -> Result<usize, SubmitError> {
    let report = validate_task_list(list);
    if !report.ok {
        audit.append(&AuditEvent::new(
            AuditEventKind::ScheduleSetError,
            json!({ "errors": report.errors }),
        ));
        return Err(SubmitError::Invalid(report));
    }

    let mut tasks = Vec::new();
    let mut undecodable = Vec::new();
    for (index, row) in list.as_array().into_iter().flatten().enumerate() {
        match PublishTask::deserialize(row) {
            Ok(task) => tasks.push(task),
            Err(error) => {
                tracing::warn!(index, error = %error, "submitted task row does not decode");
                undecodable.push(ValidationIssue {
                    index: Some(index),
                    field: "*",
                    msg: "undecodable",
                });
            }
        }
    }
    if !undecodable.is_empty() {
        let report = ValidationReport {
            ok: false,
            errors: undecodable,
            warnings: report.warnings,
        };
        audit.append(&AuditEvent::new(
            AuditEventKind::ScheduleSetError,
            json!({ "errors": report.errors }),
        ));
        return Err(SubmitError::Invalid(report));
    }

    if let Err(error) = store.save_tasks(&tasks) {
        audit.append(&AuditEvent::new(
            AuditEventKind::ScheduleSetError,
            json!({ "error": error.message }),
        ));
        return Err(SubmitError::Storage(error));
    }

    tracing::info!(count = tasks.len(), warnings = report.warnings.len(), "task list stored");
    audit.append(&AuditEvent::new(
        AuditEventKind::ScheduleSet,
        json!({ "count": tasks.len(), "warnings": report.warnings }),
    ));
    Ok(tasks.len())
}

/// Deletes an unpublished task by case-insensitive name. Published tasks stay.
pub fn remove_task(
    store: &dyn TaskListStore,
    audit: &dyn AuditSink,
    name: &str,
) -> CoreResult<PublishTask> {
    let wanted = name.trim().to_lowercase();
    let mut rows = store.load_rows()?;

    let Some((position, removed)) = rows.iter().enumerate().find_map(|(position, row)| {
        row.as_task()
            .filter(|task| task.name.trim().to_lowercase() == wanted)
            .map(|task| (position, task.clone()))
    }) else {
        return Err(CoreError::new(
            CoreErrorKind::InvalidInput,
            format!("no task named '{name}'"),
        )
        .task(name));
    };

    if removed.is_published() {
        return Err(CoreError::new(
            CoreErrorKind::InvalidInput,
            format!("task '{name}' is already published and cannot be removed"),
        )
        .task(name));
    }

    rows.remove(position);
    store.save_rows(&rows)?;

    audit.append(&AuditEvent::new(
        AuditEventKind::TaskRemoved,
        json!({ "project": removed.display_name() }),
    ));
    Ok(removed)
}
