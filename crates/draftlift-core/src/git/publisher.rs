use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;

use crate::git::commands::{CommitOutcome, GitCommandResult, GitRunner, interpret_commit};
use crate::git::hosting::{ApiAuth, ApiResponse, CreateRepoRequest, HostingApi};
use crate::git::target::GitTarget;
use crate::models::{AuditEvent, AuditEventKind, GitConfig, PublishStage, RepoVisibility};
use crate::persistence::AuditSink;
use crate::publish::copy::is_empty_dir;
use crate::redact::Redactor;
use crate::slug::slugify;

const MAX_DIAGNOSTIC_LEN: usize = 2000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PublishStatus {
    Disabled,
    NothingToPublish,
    NothingToCommit,
    Pushed,
    Failed,
}

impl PublishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NothingToPublish => "nothing_to_publish",
            Self::NothingToCommit => "nothing_to_commit",
            Self::Pushed => "pushed",
            Self::Failed => "failed",
        }
    }
}

/// What happened to one publish attempt. `remote_url` and `diagnostic` are
/// already redacted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GitPublishOutcome {
    pub status: PublishStatus,
    pub stage: Option<PublishStage>,
    pub remote_url: Option<String>,
    pub created_repo: bool,
    pub diagnostic: String,
}

impl GitPublishOutcome {
    fn with_status(status: PublishStatus, diagnostic: impl Into<String>) -> Self {
        Self {
            status,
            stage: None,
            remote_url: None,
            created_repo: false,
            diagnostic: diagnostic.into(),
        }
    }

    fn failed(stage: PublishStage, diagnostic: impl Into<String>) -> Self {
        Self {
            stage: Some(stage),
            ..Self::with_status(PublishStatus::Failed, diagnostic)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != PublishStatus::Failed
    }

    pub fn pushed(&self) -> bool {
        self.status == PublishStatus::Pushed
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishRequest {
    pub task_name: String,
    pub working_dir: PathBuf,
    pub visibility: RepoVisibility,
}

pub struct GitPublisher {
    runner: GitRunner,
    hosting: Arc<dyn HostingApi>,
    audit: Arc<dyn AuditSink>,
}

impl GitPublisher {
    pub fn new(runner: GitRunner, hosting: Arc<dyn HostingApi>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            runner,
            hosting,
            audit,
        }
    }

    pub async fn publish(&self, request: &PublishRequest, config: &GitConfig) -> GitPublishOutcome {
        if !config.enabled {
            return GitPublishOutcome::with_status(PublishStatus::Disabled, "git publishing disabled");
        }

        let redactor = Redactor::new(config.secrets());
        let outcome = self.publish_steps(request, config, &redactor).await;
        let outcome = GitPublishOutcome {
            diagnostic: truncate(&redactor.redact(&outcome.diagnostic)),
            remote_url: outcome.remote_url.map(|url| redactor.redact(&url)),
            ..outcome
        };

        match outcome.status {
            PublishStatus::Pushed => {
                tracing::info!(
                    task = %request.task_name,
                    remote = outcome.remote_url.as_deref().unwrap_or_default(),
                    created_repo = outcome.created_repo,
                    "pushed project to remote"
                );
                self.audit.append(&AuditEvent::new(
                    AuditEventKind::GitPushOk,
                    json!({
                        "project": request.task_name,
                        "remote": outcome.remote_url,
                        "branch": config.branch,
                        "createdRepo": outcome.created_repo,
                    }),
                ));
            }
            PublishStatus::Failed => {
                tracing::warn!(
                    task = %request.task_name,
                    stage = ?outcome.stage,
                    remote = outcome.remote_url.as_deref().unwrap_or_default(),
                    diagnostic = %outcome.diagnostic,
                    "git publish failed"
                );
                self.audit.append(&AuditEvent::new(
                    AuditEventKind::GitPushFail,
                    json!({
                        "project": request.task_name,
                        "remote": outcome.remote_url,
                        "branch": config.branch,
                        "stage": outcome.stage.map(|stage| stage.as_str()),
                        "error": outcome.diagnostic,
                    }),
                ));
            }
            status => {
                tracing::info!(task = %request.task_name, status = status.as_str(), "nothing pushed");
            }
        }

        outcome
    }

    async fn publish_steps(
        &self,
        request: &PublishRequest,
        config: &GitConfig,
        redactor: &Redactor,
    ) -> GitPublishOutcome {
        let task = request.task_name.as_str();
        let repo = slugify(task);
        if repo.is_empty() {
            return GitPublishOutcome::failed(
                PublishStage::Resolve,
                format!("task name '{task}' does not produce a usable repository name"),
            );
        }

        let dir = request.working_dir.as_path();
        if !dir.is_dir() {
            return GitPublishOutcome::failed(
                PublishStage::Resolve,
                format!("working directory '{}' does not exist", dir.display()),
            );
        }
        if is_empty_dir(dir) {
            return GitPublishOutcome::with_status(
                PublishStatus::NothingToPublish,
                "working directory is empty",
            );
        }

        let auth = ApiAuth::from_credentials(config.auth, &config.credentials);
        let owner = self.resolve_owner(task, config, &auth).await;
        if owner.is_empty() {
            return GitPublishOutcome::failed(
                PublishStage::Identity,
                "no repository owner configured or resolvable",
            );
        }

        let Some(target) = GitTarget::resolve(
            &config.remote_template,
            &owner,
            &repo,
            &config.branch,
            config.auth,
            &config.credentials,
        ) else {
            return GitPublishOutcome::failed(
                PublishStage::Resolve,
                "could not build a remote URL from the configured template",
            );
        };
        let remote_url = Some(target.remote_url.clone());
        let failed = |stage: PublishStage, diagnostic: String| GitPublishOutcome {
            remote_url: remote_url.clone(),
            ..GitPublishOutcome::failed(stage, diagnostic)
        };

        let private = request.visibility.is_private(config.private);
        let created_repo = match self.ensure_repo(task, &target, &auth, config, private).await {
            Ok(created) => created,
            Err(diagnostic) => return failed(PublishStage::EnsureRepo, diagnostic),
        };

        let git = |stage: PublishStage, args: Vec<String>| async move {
            self.runner.run(stage, task, dir, &args, redactor).await
        };

        let init = git(PublishStage::Init, strings(["init"])).await;
        if !init.success() {
            return failed(PublishStage::Init, init.diagnostic());
        }

        for (key, value) in [("user.name", &config.user_name), ("user.email", &config.user_email)] {
            let set = git(PublishStage::Config, strings(["config", key, value.as_str()])).await;
            if !set.success() {
                return failed(PublishStage::Config, set.diagnostic());
            }
        }

        let add = git(PublishStage::Add, strings(["add", "-A"])).await;
        if !add.success() {
            return failed(PublishStage::Add, add.diagnostic());
        }

        let message = format!("feat: publish project {task}");
        let commit = git(PublishStage::Commit, strings(["commit", "-m", message.as_str()])).await;
        match interpret_commit(&commit) {
            CommitOutcome::Committed => {}
            CommitOutcome::NothingToCommit => {
                return GitPublishOutcome {
                    remote_url: remote_url.clone(),
                    created_repo,
                    ..GitPublishOutcome::with_status(PublishStatus::NothingToCommit, "nothing to commit")
                };
            }
            CommitOutcome::Failed => return failed(PublishStage::Commit, commit.diagnostic()),
        }

        let existing = git(PublishStage::Remote, strings(["remote", "get-url", "origin"])).await;
        let verb = if existing.success() { "set-url" } else { "add" };
        let remote = git(
            PublishStage::Remote,
            strings(["remote", verb, "origin", target.authenticated_url.expose()]),
        )
        .await;
        if !remote.success() {
            return failed(PublishStage::Remote, remote.diagnostic());
        }

        let refspec = format!("HEAD:{}", target.branch);
        let push: GitCommandResult = git(
            PublishStage::Push,
            strings(["push", "-u", "origin", refspec.as_str(), "--force"]),
        )
        .await;
        if !push.success() {
            return failed(PublishStage::Push, push.diagnostic());
        }

        GitPublishOutcome {
            remote_url: remote_url.clone(),
            created_repo,
            ..GitPublishOutcome::with_status(PublishStatus::Pushed, push.diagnostic())
        }
    }

    /// Login behind the configured credential, else the configured owner.
    async fn resolve_owner(&self, task: &str, config: &GitConfig, auth: &ApiAuth) -> String {
        let declared = config.declared_owner();
        if !config.has_credential() {
            return declared;
        }

        let lookup_auth = auth.clone();
        let response = self
            .call_hosting(move |hosting| hosting.current_user(&lookup_auth))
            .await;
        let login = response
            .is_success()
            .then(|| response.json())
            .flatten()
            .and_then(|body| body.get("login").and_then(|login| login.as_str().map(str::to_string)))
            .filter(|login| !login.trim().is_empty());

        match login {
            Some(login) => {
                if !declared.is_empty() && !declared.eq_ignore_ascii_case(&login) {
                    tracing::warn!(
                        task,
                        configured = %declared,
                        authenticated = %login,
                        "configured owner differs from credential login, using login"
                    );
                }
                login
            }
            None => {
                tracing::warn!(
                    task,
                    status = response.status,
                    "could not resolve credential login, using configured owner"
                );
                declared
            }
        }
    }

    /// `Ok(true)` when the repository had to be created.
    async fn ensure_repo(
        &self,
        task: &str,
        target: &GitTarget,
        auth: &ApiAuth,
        config: &GitConfig,
        private: bool,
    ) -> Result<bool, String> {
        let (lookup_auth, owner, repo) = (auth.clone(), target.owner.clone(), target.repo.clone());
        let existing = self
            .call_hosting(move |hosting| hosting.get_repo(&lookup_auth, &owner, &repo))
            .await;
        if existing.is_success() {
            return Ok(false);
        }

        if existing.status != 404 {
            return Err(format!(
                "repository lookup for {}/{} failed with status {}: {}",
                target.owner,
                target.repo,
                existing.status,
                existing.body.trim()
            ));
        }

        if !config.auto_create {
            return Err(format!(
                "repository {}/{} does not exist and auto-create is off",
                target.owner, target.repo
            ));
        }

        let create_auth = auth.clone();
        let request = CreateRepoRequest::new(target.repo.clone(), private);
        let created = self
            .call_hosting(move |hosting| hosting.create_repo(&create_auth, &request))
            .await;

        if created.is_success() {
            tracing::info!(task, owner = %target.owner, repo = %target.repo, private, "created remote repository");
            self.audit.append(&AuditEvent::new(
                AuditEventKind::GitRepoCreated,
                json!({
                    "project": task,
                    "owner": target.owner,
                    "repo": target.repo,
                    "private": private,
                }),
            ));
            return Ok(true);
        }

        if created.says_already_exists() {
            return Ok(false);
        }

        Err(format!(
            "repository creation for {}/{} failed with status {}: {}",
            target.owner,
            target.repo,
            created.status,
            created.body.trim()
        ))
    }

    async fn call_hosting<F>(&self, call: F) -> ApiResponse
    where
        F: FnOnce(&dyn HostingApi) -> ApiResponse + Send + 'static,
    {
        let hosting = Arc::clone(&self.hosting);
        match tokio::task::spawn_blocking(move || call(hosting.as_ref())).await {
            Ok(response) => response,
            Err(error) => ApiResponse::network_error(error),
        }
    }
}

fn strings<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.into_iter().map(str::to_string).collect()
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_DIAGNOSTIC_LEN {
        return text.to_string();
    }
    let mut end = MAX_DIAGNOSTIC_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
