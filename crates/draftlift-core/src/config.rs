use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::git::commands::{DEFAULT_LOCAL_TIMEOUT, DEFAULT_PUSH_TIMEOUT};
use crate::git::hosting::DEFAULT_API_BASE;
use crate::persistence::AUDIT_LOG_FILE;

/// Filesystem roots the pipeline works under.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    pub data_dir: PathBuf,
    pub drafts_dir: PathBuf,
    pub projects_dir: PathBuf,
}

impl Layout {
    /// `<root>/data`, `<root>/storage/drafts` and `<root>/projects`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            drafts_dir: root.join("storage").join("drafts"),
            projects_dir: root.join("projects"),
        }
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.data_dir.join(AUDIT_LOG_FILE)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    pub layout: Layout,
    pub scan_interval: Duration,
    pub initial_delay: Duration,
    pub git_program: PathBuf,
    pub git_local_timeout: Duration,
    pub git_push_timeout: Duration,
    pub api_base_url: String,
    pub env_file: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            scan_interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(2),
            git_program: PathBuf::from("git"),
            git_local_timeout: DEFAULT_LOCAL_TIMEOUT,
            git_push_timeout: DEFAULT_PUSH_TIMEOUT,
            api_base_url: DEFAULT_API_BASE.to_string(),
            env_file: None,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(Layout::from_root("."))
    }
}
