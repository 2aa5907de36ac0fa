use std::fs;

use draftlift_core::models::{AppConfig, PublishTask, TaskRow};
use draftlift_core::persistence::json_store::{commit_temp_file, stage_temp_file};
use draftlift_core::persistence::{ConfigStore, JsonFileStore, StoreKind, TaskListStore};

fn sample_tasks() -> Vec<PublishTask> {
    vec![
        PublishTask::new("alpha", "drafts/alpha", "projects/alpha", "2025-09-11T14:30:00Z"),
        PublishTask::new("beta", "drafts/beta", "projects/beta", "2025-09-12T09:00:00.500Z"),
    ]
}

#[test]
fn missing_empty_and_corrupt_files_load_as_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());

    assert!(store.load_tasks().expect("missing file").is_empty());

    fs::write(store.path_for(StoreKind::TaskList), "   \n").expect("write empty");
    assert!(store.load_tasks().expect("empty file").is_empty());

    fs::write(store.path_for(StoreKind::TaskList), "[{\"name\": ").expect("write corrupt");
    assert!(store.load_tasks().expect("corrupt file").is_empty());

    fs::write(store.path_for(StoreKind::Config), "{oops").expect("write corrupt config");
    assert_eq!(store.load_config().expect("corrupt config"), AppConfig::default());
}

#[test]
fn save_replaces_whole_file_and_leaves_no_temp_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path().join("data"));

    store.save_tasks(&sample_tasks()).expect("first save");
    let mut tasks = store.load_tasks().expect("load");
    tasks.truncate(1);
    store.save_tasks(&tasks).expect("second save");

    let loaded = store.load_tasks().expect("reload");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "alpha");

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("data"))
        .expect("read data dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn crash_between_temp_write_and_rename_keeps_previous_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    store.save_tasks(&sample_tasks()).expect("initial save");
    let target = store.path_for(StoreKind::TaskList);
    let before = fs::read_to_string(&target).expect("read before");

    // Stage a replacement but never commit it, as if the process died here.
    let staged = stage_temp_file(&target, b"[]\n").expect("stage");
    assert!(staged.exists());

    assert_eq!(fs::read_to_string(&target).expect("read after"), before);
    assert_eq!(store.load_tasks().expect("load").len(), 2);

    commit_temp_file(&staged, &target).expect("commit");
    assert!(store.load_tasks().expect("load committed").is_empty());
    assert!(!staged.exists());
}

#[test]
fn failed_fallback_rename_discards_staged_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("schedule.json");
    fs::create_dir_all(&target).expect("directory squatting on target");

    let staged = stage_temp_file(&target, b"[]\n").expect("stage");
    let result = commit_temp_file(&staged, &target);

    // remove_file cannot clear a directory, so both renames fail.
    assert!(result.is_err());
    assert!(!staged.exists());
}

#[test]
fn unknown_fields_survive_a_round_trip_through_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    fs::write(
        store.path_for(StoreKind::TaskList),
        r#"[{"name":"alpha","draftPath":"drafts/alpha","publish_at":"2025-09-11T14:30:00Z","owner":"ops","tags":["a"]}]"#,
    )
    .expect("seed");

    let tasks = store.load_tasks().expect("load");
    store.save_tasks(&tasks).expect("save");

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path_for(StoreKind::TaskList)).expect("read"))
            .expect("parse");
    assert_eq!(raw[0]["owner"], "ops");
    assert_eq!(raw[0]["tags"][0], "a");
    assert_eq!(raw[0]["publishAt"], "2025-09-11T14:30:00Z");
}

#[test]
fn unreadable_files_load_as_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());

    fs::write(store.path_for(StoreKind::TaskList), [0xff, 0xfe, b'[', b']']).expect("write bytes");
    assert!(store.load_tasks().expect("invalid bytes").is_empty());

    fs::create_dir_all(store.path_for(StoreKind::Config)).expect("directory in place of file");
    assert_eq!(store.load_config().expect("unreadable config"), AppConfig::default());
}

#[test]
fn one_bad_row_does_not_hide_the_others() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonFileStore::new(dir.path());
    fs::write(
        store.path_for(StoreKind::TaskList),
        r#"[{"name":"alpha","publishAt":"2025-09-11T14:30:00Z"},{"name":"beta","draftPath":42},"stray"]"#,
    )
    .expect("seed");

    let rows = store.load_rows().expect("load rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].as_task().map(|task| task.name.as_str()), Some("alpha"));
    assert_eq!(rows[1], TaskRow::Unreadable(serde_json::json!({"name": "beta", "draftPath": 42})));
    assert_eq!(rows[2], TaskRow::Unreadable(serde_json::json!("stray")));
    assert_eq!(store.load_tasks().expect("load tasks").len(), 1);

    store.save_rows(&rows).expect("save rows");
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path_for(StoreKind::TaskList)).expect("read"))
            .expect("parse");
    assert_eq!(raw[1]["draftPath"], 42);
    assert_eq!(raw[2], "stray");
}
