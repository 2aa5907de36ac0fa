use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::models::Credentials;

pub const TOKEN_KEY: &str = "GITHUB_TOKEN";
pub const USERNAME_KEY: &str = "GIT_USERNAME";
pub const PASSWORD_KEY: &str = "GIT_PASSWORD";
pub const OWNER_KEY: &str = "GIT_OWNER";
pub const BRANCH_KEY: &str = "GIT_BRANCH";

/// Read-only source of git credentials, consulted once per scan.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn credentials(&self) -> Credentials {
        let read = |key: &str| self.get(key).filter(|value| !value.trim().is_empty());
        Credentials {
            token: read(TOKEN_KEY),
            username: read(USERNAME_KEY),
            password: read(PASSWORD_KEY),
            owner: read(OWNER_KEY),
            branch: read(BRANCH_KEY),
        }
    }
}

/// Process environment first, then an optional `.env` file. The file is
/// re-read on every lookup so edits apply at the next scan.
#[derive(Clone, Debug, Default)]
pub struct EnvCredentialStore {
    env_file: Option<PathBuf>,
}

impl EnvCredentialStore {
    pub fn new(env_file: Option<PathBuf>) -> Self {
        Self { env_file }
    }

    fn lookup_env_file(&self, key: &str) -> Option<String> {
        let path = self.env_file.as_ref()?;
        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(error) => {
                if !error.not_found() {
                    tracing::warn!(path = %path.display(), error = %error, "unreadable env file");
                }
                return None;
            }
        };

        entries
            .filter_map(Result::ok)
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl CredentialStore for EnvCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().or_else(|| self.lookup_env_file(key))
    }
}

#[derive(Clone, Default)]
pub struct StaticCredentialStore {
    values: BTreeMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl CredentialStore for StaticCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
