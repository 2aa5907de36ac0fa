use std::fmt::{Debug, Display, Formatter};

use crate::models::{AuthMode, Credentials};
use crate::redact::redact_urls;

const FALLBACK_TEMPLATE: &str = "https://github.com/{owner}/{project}.git";

/// A remote URL with credentials embedded. Only [`AuthenticatedUrl::expose`]
/// yields the raw value; formatting always masks it.
#[derive(Clone, Eq, PartialEq)]
pub struct AuthenticatedUrl(String);

impl AuthenticatedUrl {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for AuthenticatedUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthenticatedUrl({})", redact_urls(&self.0))
    }
}

impl Display for AuthenticatedUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&redact_urls(&self.0))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GitTarget {
    pub owner: String,
    pub repo: String,
    pub remote_url: String,
    pub authenticated_url: AuthenticatedUrl,
    pub branch: String,
}

impl GitTarget {
    pub fn resolve(
        template: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        auth: AuthMode,
        credentials: &Credentials,
    ) -> Option<Self> {
        let remote_url = build_remote_url(template, owner, repo)?;
        let authenticated_url = build_authenticated_url(&remote_url, auth, credentials);
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            remote_url,
            authenticated_url,
            branch: branch.to_string(),
        })
    }
}

/// Expands `{owner}` and `{project}`. A template missing either placeholder
/// falls back to the GitHub layout.
pub fn build_remote_url(template: &str, owner: &str, repo: &str) -> Option<String> {
    let owner = owner.trim();
    let repo = repo.trim();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }

    let template = template.trim();
    let template = if template.contains("{owner}") && template.contains("{project}") {
        template
    } else {
        FALLBACK_TEMPLATE
    };

    Some(template.replace("{owner}", owner).replace("{project}", repo))
}

/// Embeds credentials into an `https://` remote. Other schemes and missing
/// credentials return the plain URL unchanged.
pub fn build_authenticated_url(
    remote_url: &str,
    auth: AuthMode,
    credentials: &Credentials,
) -> AuthenticatedUrl {
    let Some(rest) = remote_url.strip_prefix("https://") else {
        return AuthenticatedUrl(remote_url.to_string());
    };

    let userinfo = match auth {
        AuthMode::Token => credentials
            .token
            .as_deref()
            .map(|token| format!("x-access-token:{}", urlencoding::encode(token))),
        AuthMode::Basic => match (
            credentials.username.as_deref(),
            credentials.password.as_deref(),
        ) {
            (Some(user), Some(pass)) => Some(format!(
                "{}:{}",
                urlencoding::encode(user),
                urlencoding::encode(pass)
            )),
            _ => None,
        },
    };

    match userinfo {
        Some(userinfo) => AuthenticatedUrl(format!("https://{userinfo}@{rest}")),
        None => AuthenticatedUrl(remote_url.to_string()),
    }
}
