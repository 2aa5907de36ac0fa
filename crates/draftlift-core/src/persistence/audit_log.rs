use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::AuditEvent;
use crate::persistence::AuditSink;

#[derive(Clone, Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Newest first. Lines that do not parse are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<AuditEvent> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };

        raw.lines()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<AuditEvent>(line).ok())
            .take(limit)
            .collect()
    }

    fn try_append(&self, event: &AuditEvent) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)
    }
}

impl AuditSink for JsonlAuditLog {
    fn append(&self, event: &AuditEvent) {
        if let Err(error) = self.try_append(event) {
            tracing::warn!(
                path = %self.path.display(),
                event = ?event.event,
                error = %error,
                "failed to append audit event"
            );
        }
    }
}
