#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use draftlift_core::config::Layout;
use draftlift_core::credentials::{StaticCredentialStore, TOKEN_KEY};
use draftlift_core::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessWaitFuture, RunningProcess,
};
use draftlift_core::git::{
    ApiAuth, ApiResponse, CreateRepoRequest, GitPublisher, GitRunner, HostingApi,
};
use draftlift_core::models::{AppConfig, AuditEvent, AuditEventKind, GitSettings};
use draftlift_core::persistence::{AuditSink, ConfigStore, JsonFileStore};
use draftlift_core::publish::PublishEngine;

pub const TOKEN: &str = "ghp_s3cr3tT0ken";

/// Scripted `git`: every call succeeds unless a subcommand is given a canned
/// failure. Argument vectors are recorded in call order.
#[derive(Default)]
pub struct FakeGit {
    calls: Mutex<Vec<Vec<String>>>,
    failures: Mutex<BTreeMap<String, (i32, String, String)>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeGit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, subcommand: &str, code: i32, stdout: &str, stderr: &str) {
        self.failures.lock().expect("failures lock").insert(
            subcommand.to_string(),
            (code, stdout.to_string(), stderr.to_string()),
        );
    }

    pub fn slow(&self, delay: Duration) {
        *self.delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|args| args.first().cloned())
            .collect()
    }
}

struct FakeProcess {
    output: ProcessOutput,
    delay: Option<Duration>,
}

impl RunningProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let output = self.output;
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(output)
        })
    }
}

impl ProcessExecutor for FakeGit {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let args = request.command.args.clone();
        self.calls.lock().expect("calls lock").push(args.clone());

        let subcommand = args.first().cloned().unwrap_or_default();
        let key = if subcommand == "remote" {
            format!("remote {}", args.get(1).cloned().unwrap_or_default())
        } else {
            subcommand
        };

        let (code, stdout, stderr) = self
            .failures
            .lock()
            .expect("failures lock")
            .get(&key)
            .cloned()
            .unwrap_or((0, String::new(), String::new()));

        let now = SystemTime::now();
        Ok(Box::new(FakeProcess {
            output: ProcessOutput {
                status: ProcessExitStatus::ExitCode(code),
                stdout: stdout.into_bytes(),
                stderr: stderr.into_bytes(),
                started_at: now,
                finished_at: now,
            },
            delay: *self.delay.lock().expect("delay lock"),
        }))
    }
}

/// Hosting API with a fixed login and a scripted repository lookup.
pub struct FakeHosting {
    pub login: String,
    pub repo_status: u16,
    pub create_response: ApiResponse,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<CreateRepoRequest>>,
    auth_seen: Mutex<Vec<ApiAuth>>,
}

impl FakeHosting {
    pub fn new(repo_status: u16) -> Arc<Self> {
        Arc::new(Self {
            login: "acme".to_string(),
            repo_status,
            create_response: ApiResponse::new(201, r#"{"full_name":"acme/demo"}"#),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            auth_seen: Mutex::new(Vec::new()),
        })
    }

    pub fn with_create_response(repo_status: u16, create_response: ApiResponse) -> Arc<Self> {
        let mut hosting = Self::new(repo_status);
        if let Some(inner) = Arc::get_mut(&mut hosting) {
            inner.create_response = create_response;
        }
        hosting
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn created(&self) -> Vec<CreateRepoRequest> {
        self.created.lock().expect("created lock").clone()
    }

    pub fn auth_seen(&self) -> Vec<ApiAuth> {
        self.auth_seen.lock().expect("auth lock").clone()
    }

    fn record(&self, call: String, auth: &ApiAuth) {
        self.calls.lock().expect("calls lock").push(call);
        self.auth_seen.lock().expect("auth lock").push(auth.clone());
    }
}

impl HostingApi for FakeHosting {
    fn current_user(&self, auth: &ApiAuth) -> ApiResponse {
        self.record("GET /user".to_string(), auth);
        ApiResponse::new(200, format!(r#"{{"login":"{}"}}"#, self.login))
    }

    fn get_repo(&self, auth: &ApiAuth, owner: &str, repo: &str) -> ApiResponse {
        self.record(format!("GET /repos/{owner}/{repo}"), auth);
        ApiResponse::new(self.repo_status, r#"{"message":"Not Found"}"#)
    }

    fn create_repo(&self, auth: &ApiAuth, request: &CreateRepoRequest) -> ApiResponse {
        self.record("POST /user/repos".to_string(), auth);
        self.created.lock().expect("created lock").push(request.clone());
        self.create_response.clone()
    }
}

#[derive(Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn kinds(&self) -> Vec<AuditEventKind> {
        self.events().into_iter().map(|event| event.event).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn append(&self, event: &AuditEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }
}

pub fn enabled_settings() -> GitSettings {
    GitSettings {
        enabled: true,
        owner: "acme".to_string(),
        auto_create: true,
        ..GitSettings::default()
    }
}

pub fn publisher(git: Arc<FakeGit>, hosting: Arc<FakeHosting>, audit: Arc<MemoryAudit>) -> GitPublisher {
    GitPublisher::new(GitRunner::new(git, "git"), hosting, audit)
}

pub struct Harness {
    pub layout: Layout,
    pub store: Arc<JsonFileStore>,
    pub git: Arc<FakeGit>,
    pub hosting: Arc<FakeHosting>,
    pub audit: Arc<MemoryAudit>,
    pub engine: PublishEngine,
}

impl Harness {
    pub fn new(root: &Path, settings: GitSettings, hosting: Arc<FakeHosting>) -> Self {
        let layout = Layout::from_root(root);
        let store = Arc::new(JsonFileStore::new(layout.data_dir.clone()));
        store
            .save_config(&AppConfig {
                git: settings,
                ..AppConfig::default()
            })
            .expect("config should save");

        let git = FakeGit::new();
        let audit = MemoryAudit::new();
        let credentials = Arc::new(StaticCredentialStore::new().with(TOKEN_KEY, TOKEN));
        let engine = PublishEngine::new(
            layout.clone(),
            store.clone(),
            store.clone(),
            credentials,
            audit.clone(),
            publisher(git.clone(), hosting.clone(), audit.clone()),
        );

        Self {
            layout,
            store,
            git,
            hosting,
            audit,
            engine,
        }
    }

    pub fn disabled(root: &Path) -> Self {
        Self::new(root, GitSettings::default(), FakeHosting::new(200))
    }

    pub fn write_draft(&self, relative: &str) {
        let dir = self.layout.drafts_dir.join(relative);
        std::fs::create_dir_all(dir.join("assets")).expect("draft dir");
        std::fs::write(dir.join("index.html"), "<h1>demo</h1>").expect("draft index");
        std::fs::write(dir.join("assets/site.css"), "body{}").expect("draft css");
    }
}

pub fn minutes_ago(minutes: i64) -> String {
    draftlift_core::timestamp::format_utc(
        time::OffsetDateTime::now_utc() - time::Duration::minutes(minutes),
    )
}
