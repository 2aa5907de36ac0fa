use std::fmt::{Debug, Formatter};
use std::sync::LazyLock;

use regex::Regex;

pub const MASK: &str = "***";

static URL_USERINFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z][a-z0-9+.\-]*://)[^/@\s]+@").expect("userinfo pattern compiles")
});

static ACCESS_TOKEN_USERINFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"x-access-token:[^@\s]+@").expect("access token pattern compiles")
});

/// Masks credentials in text headed for logs, audit records or diagnostics.
///
/// Always strips URL userinfo. Secrets registered with the redactor are
/// replaced wherever they appear, even outside a URL.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new(secrets: impl IntoIterator<Item = String>) -> Self {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .filter(|secret| !secret.is_empty())
            .collect();
        // Longest first so a secret that contains another is masked whole.
        secrets.sort_by_key(|secret| std::cmp::Reverse(secret.len()));
        secrets.dedup();
        Self { secrets }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut masked = redact_urls(text);
        for secret in &self.secrets {
            if masked.contains(secret.as_str()) {
                masked = masked.replace(secret.as_str(), MASK);
            }
        }
        masked
    }

    pub fn redact_args(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|arg| self.redact(arg)).collect()
    }
}

impl Debug for Redactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

/// Strips userinfo from every URL in `text`.
pub fn redact_urls(text: &str) -> String {
    let masked = URL_USERINFO.replace_all(text, "${1}***@");
    ACCESS_TOKEN_USERINFO
        .replace_all(&masked, "x-access-token:***@")
        .into_owned()
}
