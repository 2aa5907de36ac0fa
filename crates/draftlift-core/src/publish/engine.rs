use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::config::{Layout, RuntimeConfig};
use crate::credentials::{CredentialStore, EnvCredentialStore};
use crate::execution::TokioProcessExecutor;
use crate::git::{GitPublishOutcome, GitPublisher, GitRunner, PublishRequest, UreqHostingApi};
use crate::models::{
    AuditEvent, AuditEventKind, CoreError, CoreErrorKind, CoreResult, GitConfig, PublishStage,
    PublishTask, TaskRow, TaskState,
};
use crate::persistence::{AuditSink, ConfigStore, JsonFileStore, JsonlAuditLog, TaskListStore};
use crate::publish::copy::{copy_tree, remove_tree};
use crate::publish::guard::ScanLock;
use crate::timestamp;

const DRAFTS_PREFIX: &str = "drafts";
const PROJECTS_PREFIX: &str = "projects";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PromotionStatus {
    Published,
    SourceMissing,
    CopyFailed,
    PublishFailed,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PromotionOutcome {
    pub status: PromotionStatus,
    pub copied: bool,
    pub pushed: bool,
    pub published_at: Option<String>,
    pub git: Option<GitPublishOutcome>,
    pub error: Option<String>,
}

impl PromotionOutcome {
    fn not_copied(status: PromotionStatus, error: String) -> Self {
        Self {
            status,
            copied: false,
            pushed: false,
            published_at: None,
            git: None,
            error: Some(error),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ScanReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub processed: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanReport {
    fn already_running() -> Self {
        Self {
            ok: false,
            reason: Some("already_running"),
            ..Self::default()
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.reason == Some("already_running")
    }
}

pub struct PublishEngine {
    layout: Layout,
    tasks: Arc<dyn TaskListStore>,
    config: Arc<dyn ConfigStore>,
    credentials: Arc<dyn CredentialStore>,
    audit: Arc<dyn AuditSink>,
    publisher: GitPublisher,
    lock: ScanLock,
}

impl PublishEngine {
    pub fn new(
        layout: Layout,
        tasks: Arc<dyn TaskListStore>,
        config: Arc<dyn ConfigStore>,
        credentials: Arc<dyn CredentialStore>,
        audit: Arc<dyn AuditSink>,
        publisher: GitPublisher,
    ) -> Self {
        Self {
            layout,
            tasks,
            config,
            credentials,
            audit,
            publisher,
            lock: ScanLock::new(),
        }
    }

    /// Production wiring: JSON files, env credentials, real git and HTTP.
    pub fn from_runtime_config(runtime: &RuntimeConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(runtime.layout.data_dir.clone()));
        let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditLog::new(runtime.layout.audit_log_path()));
        let runner = GitRunner::new(Arc::new(TokioProcessExecutor), runtime.git_program.clone())
            .timeouts(runtime.git_local_timeout, runtime.git_push_timeout);
        let publisher = GitPublisher::new(
            runner,
            Arc::new(UreqHostingApi::new(runtime.api_base_url.clone())),
            Arc::clone(&audit),
        );

        Self::new(
            runtime.layout.clone(),
            store.clone(),
            store,
            Arc::new(EnvCredentialStore::new(runtime.env_file.clone())),
            audit,
            publisher,
        )
    }

    pub fn is_scanning(&self) -> bool {
        self.lock.is_held()
    }

    /// Persisted git settings merged with the current credentials.
    pub fn git_config(&self) -> CoreResult<GitConfig> {
        let stored = self.config.load_config()?;
        Ok(GitConfig::resolve(&stored.git, self.credentials.credentials()))
    }

    pub async fn promote_one(&self, task: &mut PublishTask) -> CoreResult<PromotionOutcome> {
        let config = self.git_config()?;
        self.promote_with(task, &config).await
    }

    pub async fn promote_with(
        &self,
        task: &mut PublishTask,
        config: &GitConfig,
    ) -> CoreResult<PromotionOutcome> {
        let name = task.display_name();
        let slug = task.slug();
        if slug.is_empty() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("task name '{name}' is empty after sanitizing"),
            )
            .task(name)
            .stage(PublishStage::Resolve));
        }

        let destination = self.layout.projects_dir.join(&slug);
        let source = match self.locate_source(task, &name) {
            Ok(source) => source,
            Err(error) if error.kind == CoreErrorKind::SourceMissing => {
                tracing::warn!(task = %name, error = %error.message, "draft source missing, skipping");
                self.audit.append(&AuditEvent::new(
                    AuditEventKind::PublishSkipMissing,
                    json!({ "project": name, "draftPath": task.draft_path, "error": error.message }),
                ));
                return Ok(PromotionOutcome::not_copied(
                    PromotionStatus::SourceMissing,
                    error.message,
                ));
            }
            Err(error) => return Err(error),
        };

        let started = Instant::now();
        let copied = {
            let (source, destination) = (source.clone(), destination.clone());
            run_blocking(&name, PublishStage::Copy, move || copy_tree(&source, &destination)).await?
        };
        if let Err(error) = copied {
            let message = format!("copy to '{}' failed: {error}", destination.display());
            self.roll_back(&name, &destination).await;
            tracing::error!(task = %name, stage = %PublishStage::Copy, error = %message, "promotion failed");
            self.audit.append(&AuditEvent::new(
                AuditEventKind::PublishError,
                json!({ "project": name, "stage": PublishStage::Copy.as_str(), "error": message }),
            ));
            return Ok(PromotionOutcome::not_copied(PromotionStatus::CopyFailed, message));
        }

        let request = PublishRequest {
            task_name: name.clone(),
            working_dir: destination.clone(),
            visibility: task.visibility(),
        };
        let git = self.publisher.publish(&request, config).await;

        if git.is_success() {
            let published_at = timestamp::now_utc();
            task.published_at = Some(published_at.clone());
            tracing::info!(
                task = %name,
                git = git.status.as_str(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "published"
            );
            self.audit.append(&AuditEvent::new(
                AuditEventKind::PublishOk,
                json!({
                    "project": name,
                    "publishedAt": published_at,
                    "destination": format!("{PROJECTS_PREFIX}/{slug}"),
                    "git": git.status.as_str(),
                    "remote": git.remote_url,
                }),
            ));
            return Ok(PromotionOutcome {
                status: PromotionStatus::Published,
                copied: true,
                pushed: git.pushed(),
                published_at: Some(published_at),
                git: Some(git),
                error: None,
            });
        }

        self.roll_back(&name, &destination).await;
        self.audit.append(&AuditEvent::new(
            AuditEventKind::PublishFailGit,
            json!({
                "project": name,
                "stage": git.stage.map(|stage| stage.as_str()),
                "error": git.diagnostic,
                "rolledBack": true,
            }),
        ));
        Ok(PromotionOutcome {
            status: PromotionStatus::PublishFailed,
            copied: false,
            pushed: false,
            published_at: None,
            error: Some(git.diagnostic.clone()),
            git: Some(git),
        })
    }

    pub async fn scan_and_publish(&self) -> ScanReport {
        let Some(_guard) = self.lock.try_acquire() else {
            tracing::info!("scan already running, skipping");
            return ScanReport::already_running();
        };

        let started = Instant::now();
        let mut report = ScanReport {
            ok: true,
            ..ScanReport::default()
        };

        let loaded = self
            .tasks
            .load_rows()
            .and_then(|rows| self.git_config().map(|config| (rows, config)));
        let (mut rows, config) = match loaded {
            Ok(loaded) => loaded,
            Err(error) => {
                tracing::error!(error = %error, "scan could not start");
                report.ok = false;
                report.error = Some(error.to_string());
                return report;
            }
        };

        for row in rows.iter_mut() {
            report.processed += 1;
            let TaskRow::Task(task) = row else {
                report.skipped += 1;
                continue;
            };
            match task.state_at(OffsetDateTime::now_utc()) {
                TaskState::Due => {}
                TaskState::Unscheduled | TaskState::Published | TaskState::Waiting { .. } => {
                    report.skipped += 1;
                    continue;
                }
            }

            match self.promote_with(task, &config).await {
                Ok(outcome) if outcome.status == PromotionStatus::Published => {
                    report.published += 1;
                    report.changed = true;
                }
                Ok(_) => report.failed += 1,
                Err(error) => {
                    let name = task.display_name();
                    tracing::error!(
                        task = %name,
                        stage = ?error.stage,
                        error = %error.message,
                        "scan aborted by unexpected error"
                    );
                    self.audit.append(&AuditEvent::new(
                        AuditEventKind::PublishError,
                        json!({
                            "project": name,
                            "stage": error.stage.map(|stage| stage.as_str()),
                            "error": error.message,
                        }),
                    ));
                    report.failed += 1;
                    report.ok = false;
                    report.error = Some(error.to_string());
                    break;
                }
            }
        }

        if report.changed
            && let Err(error) = self.tasks.save_rows(&rows)
        {
            tracing::error!(error = %error, "failed to persist task list");
            report.ok = false;
            report.error = Some(error.to_string());
        }

        tracing::info!(
            processed = report.processed,
            published = report.published,
            skipped = report.skipped,
            failed = report.failed,
            changed = report.changed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan finished"
        );

        report
    }

    fn locate_source(&self, task: &PublishTask, name: &str) -> CoreResult<PathBuf> {
        let relative = match (non_blank(&task.draft_path), non_blank(&task.live_path)) {
            (Some(draft), _) => namespaced(draft, DRAFTS_PREFIX, name)?,
            (None, Some(live)) => namespaced(live, PROJECTS_PREFIX, name)?,
            (None, None) => {
                return Err(CoreError::new(
                    CoreErrorKind::InvalidInput,
                    "task has neither draftPath nor livePath",
                )
                .task(name)
                .stage(PublishStage::Resolve));
            }
        };

        let source = self.layout.drafts_dir.join(relative);
        if source.is_dir() {
            Ok(source)
        } else {
            Err(CoreError::new(
                CoreErrorKind::SourceMissing,
                format!("draft source '{}' not found", source.display()),
            )
            .task(name)
            .stage(PublishStage::Resolve))
        }
    }

    async fn roll_back(&self, name: &str, destination: &Path) {
        let target = destination.to_path_buf();
        match run_blocking(name, PublishStage::Rollback, move || remove_tree(&target)).await {
            Ok(Ok(())) => {
                tracing::info!(task = %name, path = %destination.display(), "rolled back live tree");
            }
            Ok(Err(error)) => {
                tracing::error!(task = %name, path = %destination.display(), error = %error, "rollback failed");
            }
            Err(error) => {
                tracing::error!(task = %name, error = %error, "rollback failed");
            }
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Strips the namespace root from a logical path and rejects anything that
/// could leave it.
fn namespaced(logical: &str, root: &str, name: &str) -> CoreResult<PathBuf> {
    let normalized = logical.replace('\\', "/");
    let rest = if normalized == root {
        ""
    } else {
        normalized
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&normalized)
    };

    let escape = || {
        CoreError::new(
            CoreErrorKind::InvalidInput,
            format!("path '{logical}' escapes the '{root}' namespace"),
        )
        .task(name)
        .stage(PublishStage::Resolve)
    };

    let mut relative = PathBuf::new();
    for component in Path::new(rest).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(escape());
            }
        }
    }
    Ok(relative)
}

async fn run_blocking<T, F>(name: &str, stage: PublishStage, work: F) -> CoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|error| {
        CoreError::new(
            CoreErrorKind::Internal,
            format!("blocking {stage} work did not complete: {error}"),
        )
        .task(name)
        .stage(stage)
    })
}
