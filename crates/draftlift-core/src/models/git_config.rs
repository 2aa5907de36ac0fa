use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE_TEMPLATE: &str = "https://github.com/{owner}/{project}.git";
pub const DEFAULT_COMMITTER_NAME: &str = "DraftLift";
pub const DEFAULT_COMMITTER_EMAIL: &str = "draftlift@localhost";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Token,
    Basic,
}

/// Persisted git settings. Secrets never live here; see [`Credentials`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitSettings {
    pub enabled: bool,
    pub owner: String,
    pub branch: String,
    #[serde(rename = "remoteTpl")]
    pub remote_template: String,
    pub auth: AuthMode,
    pub auto_create: bool,
    pub private: bool,
    pub user_name: String,
    pub user_email: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            owner: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            remote_template: DEFAULT_REMOTE_TEMPLATE.to_string(),
            auth: AuthMode::Token,
            auto_create: false,
            private: false,
            user_name: DEFAULT_COMMITTER_NAME.to_string(),
            user_email: DEFAULT_COMMITTER_EMAIL.to_string(),
        }
    }
}

/// The configuration record stored next to the task list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "GIT", default)]
    pub git: GitSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Default, Eq, PartialEq)]
pub struct Credentials {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub owner: Option<String>,
    pub branch: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("has_token", &self.token.is_some())
            .field("has_username", &self.username.is_some())
            .field("has_password", &self.password.is_some())
            .field("owner", &self.owner)
            .field("branch", &self.branch)
            .finish()
    }
}

/// Git configuration for one scan: persisted settings with credentials merged in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GitConfig {
    pub enabled: bool,
    pub owner: String,
    pub branch: String,
    pub remote_template: String,
    pub auth: AuthMode,
    pub auto_create: bool,
    pub private: bool,
    pub user_name: String,
    pub user_email: String,
    pub credentials: Credentials,
}

impl GitConfig {
    pub fn resolve(settings: &GitSettings, credentials: Credentials) -> Self {
        let owner = non_empty(&settings.owner)
            .or_else(|| credentials.owner.as_deref().and_then(non_empty))
            .unwrap_or_default();
        let branch = non_empty(&settings.branch)
            .or_else(|| credentials.branch.as_deref().and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let remote_template = non_empty(&settings.remote_template)
            .unwrap_or_else(|| DEFAULT_REMOTE_TEMPLATE.to_string());
        let user_name = non_empty(&settings.user_name)
            .unwrap_or_else(|| DEFAULT_COMMITTER_NAME.to_string());
        let user_email = non_empty(&settings.user_email)
            .unwrap_or_else(|| DEFAULT_COMMITTER_EMAIL.to_string());

        Self {
            enabled: settings.enabled,
            owner,
            branch,
            remote_template,
            auth: settings.auth,
            auto_create: settings.auto_create,
            private: settings.private,
            user_name,
            user_email,
            credentials,
        }
    }

    pub fn disabled() -> Self {
        Self::resolve(&GitSettings::default(), Credentials::default())
    }

    /// Owner as configured, before any identity lookup against the hosting API.
    pub fn declared_owner(&self) -> String {
        non_empty(&self.owner)
            .or_else(|| self.credentials.username.as_deref().and_then(non_empty))
            .unwrap_or_default()
    }

    pub fn has_credential(&self) -> bool {
        match self.auth {
            AuthMode::Token => self.credentials.token.is_some(),
            AuthMode::Basic => self.credentials.username.is_some(),
        }
    }

    pub fn secrets(&self) -> Vec<String> {
        [
            self.credentials.token.as_deref(),
            self.credentials.password.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|secret| !secret.is_empty())
        .map(str::to_string)
        .collect()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_from_legacy_record() {
        let raw = r#"{"GIT": {"enabled": true, "owner": "acme", "remoteTpl": "https://git.example/{owner}/{project}.git", "autoCreate": true}, "THEME": "dark"}"#;
        let config: AppConfig = serde_json::from_str(raw).expect("config should parse");

        assert!(config.git.enabled);
        assert!(config.git.auto_create);
        assert_eq!(config.git.branch, DEFAULT_BRANCH);
        assert_eq!(config.git.remote_template, "https://git.example/{owner}/{project}.git");
        assert_eq!(config.extra.get("THEME"), Some(&Value::from("dark")));
    }

    #[test]
    fn resolve_falls_back_to_credential_store_values() {
        let settings = GitSettings {
            branch: String::new(),
            ..GitSettings::default()
        };
        let credentials = Credentials {
            token: Some("tok".to_string()),
            owner: Some("env-owner".to_string()),
            branch: Some("release".to_string()),
            ..Credentials::default()
        };

        let config = GitConfig::resolve(&settings, credentials);
        assert_eq!(config.owner, "env-owner");
        assert_eq!(config.branch, "release");
        assert!(config.has_credential());
        assert_eq!(config.secrets(), vec!["tok".to_string()]);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials {
            token: Some("ghp_secret".to_string()),
            username: Some("deploy-bot".to_string()),
            password: Some("hunter2".to_string()),
            ..Credentials::default()
        };
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("ghp_secret"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("deploy-bot"));
        assert!(printed.contains("has_username: true"));
    }
}
