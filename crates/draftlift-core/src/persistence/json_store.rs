use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::models::{AppConfig, CoreError, CoreErrorKind, PublishStage, PublishTask, TaskRow};
use crate::persistence::{ConfigStore, PersistenceResult, StoreKind, TaskListStore};

/// Task list and configuration record kept as JSON files under one data directory.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, kind: StoreKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    pub fn load<T: DeserializeOwned>(&self, kind: StoreKind, default: T) -> PersistenceResult<T> {
        read_json_or(&self.path_for(kind), default)
    }

    pub fn save<T: Serialize + ?Sized>(&self, kind: StoreKind, value: &T) -> PersistenceResult<()> {
        write_json_atomic(&self.path_for(kind), value)
    }
}

impl TaskListStore for JsonFileStore {
    fn load_rows(&self) -> PersistenceResult<Vec<TaskRow>> {
        let raw: Vec<Value> = self.load(StoreKind::TaskList, Vec::new())?;
        let rows = raw
            .into_iter()
            .enumerate()
            .map(|(index, value)| match TaskRow::decode(value) {
                Ok(row) => row,
                Err((value, error)) => {
                    tracing::warn!(
                        path = %self.path_for(StoreKind::TaskList).display(),
                        index,
                        error = %error,
                        "task row does not decode, keeping it as-is"
                    );
                    TaskRow::Unreadable(value)
                }
            })
            .collect();
        Ok(rows)
    }

    fn save_rows(&self, rows: &[TaskRow]) -> PersistenceResult<()> {
        self.save(StoreKind::TaskList, rows)
    }

    fn save_tasks(&self, tasks: &[PublishTask]) -> PersistenceResult<()> {
        self.save(StoreKind::TaskList, tasks)
    }
}

impl ConfigStore for JsonFileStore {
    fn load_config(&self) -> PersistenceResult<AppConfig> {
        self.load(StoreKind::Config, AppConfig::default())
    }

    fn save_config(&self, config: &AppConfig) -> PersistenceResult<()> {
        self.save(StoreKind::Config, config)
    }
}

/// Reads a JSON store file. A missing, empty, unreadable or unparseable file
/// yields `default`; everything but a missing file is logged.
pub fn read_json_or<T: DeserializeOwned>(path: &Path, default: T) -> PersistenceResult<T> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(default),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "unreadable JSON store file, using default"
            );
            return Ok(default);
        }
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(default);
    }

    match serde_json::from_slice(&raw) {
        Ok(value) => Ok(value),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "corrupt JSON store file, using default"
            );
            Ok(default)
        }
    }
}

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> PersistenceResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|error| {
        storage_failure(format!("failed to encode '{}': {error}", path.display()))
    })?;
    bytes.push(b'\n');

    let temp_path = stage_temp_file(path, &bytes)?;
    commit_temp_file(&temp_path, path)
}

/// Writes `bytes` to a fresh temporary file next to `target` and syncs it.
pub fn stage_temp_file(target: &Path, bytes: &[u8]) -> PersistenceResult<PathBuf> {
    let dir = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|error| {
        storage_failure(format!("failed to create '{}': {error}", dir.display()))
    })?;

    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "store".to_string());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{file_name}.tmp-{}-{nanos}", std::process::id()));

    let written = File::create(&temp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(error) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(storage_failure(format!(
            "failed to write '{}': {error}",
            temp_path.display()
        )));
    }

    Ok(temp_path)
}

/// Renames a staged file over `target`. A failed rename is retried once after
/// removing the target; if that also fails the staged file is discarded.
pub fn commit_temp_file(temp_path: &Path, target: &Path) -> PersistenceResult<()> {
    let Err(first) = fs::rename(temp_path, target) else {
        return Ok(());
    };

    tracing::warn!(
        path = %target.display(),
        error = %first,
        "atomic rename failed, retrying after removing target"
    );
    let _ = fs::remove_file(target);

    match fs::rename(temp_path, target) {
        Ok(()) => Ok(()),
        Err(error) => {
            let _ = fs::remove_file(temp_path);
            Err(storage_failure(format!(
                "failed to replace '{}': {error}",
                target.display()
            )))
        }
    }
}

fn storage_failure(message: String) -> CoreError {
    CoreError::new(CoreErrorKind::StorageFailure, message).stage(PublishStage::Store)
}
