mod support;

use draftlift_core::models::{AuditEvent, AuditEventKind};
use draftlift_core::persistence::{AuditSink, JsonFileStore, JsonlAuditLog, StoreKind, TaskListStore};
use draftlift_core::schedule::{SubmitError, remove_task, submit_task_list};
use serde_json::json;
use support::MemoryAudit;

#[test]
fn valid_list_is_stored_and_audited() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    let audit = MemoryAudit::new();
    let list = json!([
        {"name": "Alpha", "draftPath": "drafts/alpha", "livePath": "projects/alpha", "publishAt": "2030-01-01T00:00:00Z", "uploadedBy": "ops"}
    ]);

    let count = submit_task_list(&store, audit.as_ref(), &list).expect("submit");

    assert_eq!(count, 1);
    let tasks = store.load_tasks().expect("load");
    assert_eq!(tasks[0].name, "Alpha");
    assert_eq!(tasks[0].extra.get("uploadedBy"), Some(&json!("ops")));
    assert_eq!(audit.kinds(), vec![AuditEventKind::ScheduleSet]);
}

#[test]
fn invalid_list_is_rejected_without_touching_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    let audit = MemoryAudit::new();
    let list = json!([{"name": "", "publishAt": "soon"}]);

    let error = submit_task_list(&store, audit.as_ref(), &list).expect_err("must reject");

    let report = match error {
        SubmitError::Invalid(report) => report,
        other => panic!("expected a validation rejection, got {other:?}"),
    };
    assert_eq!(report.errors.len(), 2);
    assert!(store.load_tasks().expect("load").is_empty());
    assert_eq!(audit.kinds(), vec![AuditEventKind::ScheduleSetError]);
}

#[test]
fn remove_refuses_published_tasks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    let audit = MemoryAudit::new();
    submit_task_list(
        &store,
        audit.as_ref(),
        &json!([
            {"name": "Alpha", "publishAt": "2030-01-01T00:00:00Z"},
            {"name": "Beta", "publishAt": "2030-01-01T00:00:00Z", "publishedAt": "2030-01-01T00:00:01.000Z"}
        ]),
    )
    .expect("submit");

    let removed = remove_task(&store, audit.as_ref(), "alpha").expect("remove unpublished");
    assert_eq!(removed.name, "Alpha");
    assert!(remove_task(&store, audit.as_ref(), "BETA").is_err());
    assert!(remove_task(&store, audit.as_ref(), "gamma").is_err());

    let remaining = store.load_tasks().expect("load");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Beta");
    assert_eq!(
        audit.kinds(),
        vec![AuditEventKind::ScheduleSet, AuditEventKind::TaskRemoved]
    );
}

#[test]
fn remove_keeps_rows_that_do_not_decode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    let audit = MemoryAudit::new();
    let path = store.path_for(StoreKind::TaskList);
    std::fs::write(
        &path,
        r#"[{"name":"Alpha","publishAt":"2030-01-01T00:00:00Z"},{"name":"Legacy","publishAt":"2030-01-01T00:00:00Z","publish_at":"2031-01-01T00:00:00Z"}]"#,
    )
    .expect("seed");

    remove_task(&store, audit.as_ref(), "alpha").expect("remove");

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(raw.as_array().map(Vec::len), Some(1));
    assert_eq!(raw[0]["publish_at"], "2031-01-01T00:00:00Z");
    assert!(remove_task(&store, audit.as_ref(), "legacy").is_err());
}

#[test]
fn rows_with_both_spellings_of_a_field_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    let audit = MemoryAudit::new();
    let list = json!([
        {"name": "Twice", "publishAt": "2030-01-01T00:00:00Z", "publish_at": "2031-01-01T00:00:00Z"}
    ]);

    match submit_task_list(&store, audit.as_ref(), &list) {
        Err(SubmitError::Invalid(report)) => {
            assert_eq!(report.errors.len(), 1);
            assert_eq!(report.errors[0].msg, "conflicting-alias");
        }
        other => panic!("expected a validation rejection, got {other:?}"),
    }
    assert!(!store.path_for(StoreKind::TaskList).exists());
    assert_eq!(audit.kinds(), vec![AuditEventKind::ScheduleSetError]);
}

#[test]
fn audit_log_reads_newest_first_and_skips_garbage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = JsonlAuditLog::new(dir.path().join("data/audit.jsonl"));

    log.append(&AuditEvent::new(AuditEventKind::ScheduleSet, json!({"count": 1})));
    std::fs::write(
        log.path(),
        format!(
            "{}not json\n",
            std::fs::read_to_string(log.path()).expect("read log")
        ),
    )
    .expect("corrupt a line");
    log.append(&AuditEvent::new(AuditEventKind::PublishOk, json!({"project": "demo"})));

    let recent = log.read_recent(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].event, AuditEventKind::PublishOk);
    assert_eq!(recent[1].event, AuditEventKind::ScheduleSet);
    assert_eq!(log.read_recent(1).len(), 1);
}
