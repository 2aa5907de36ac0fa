use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::Value;

use crate::models::{AuthMode, Credentials};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "DraftLift";
const ACCEPT: &str = "application/vnd.github.v3+json";
const REPO_DESCRIPTION: &str = "Automatically created by DraftLift";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Transport failures surface as a synthetic 503.
    pub fn network_error(message: impl Display) -> Self {
        Self::new(503, format!("Network Error: {message}"))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn says_already_exists(&self) -> bool {
        matches!(self.status, 409 | 422) && self.body.to_ascii_lowercase().contains("already exists")
    }
}

#[derive(Clone, Default, Eq, PartialEq)]
pub enum ApiAuth {
    #[default]
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl ApiAuth {
    pub fn from_credentials(mode: AuthMode, credentials: &Credentials) -> Self {
        match mode {
            AuthMode::Token => credentials
                .token
                .clone()
                .map(Self::Bearer)
                .unwrap_or_default(),
            AuthMode::Basic => match (&credentials.username, &credentials.password) {
                (Some(username), Some(password)) => Self::Basic {
                    username: username.clone(),
                    password: password.clone(),
                },
                _ => Self::None,
            },
        }
    }

    pub fn header(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bearer(token) => Some(format!("Bearer {token}")),
            Self::Basic { username, password } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{username}:{password}"))
            )),
        }
    }
}

impl Debug for ApiAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Basic { username, .. } => write!(f, "Basic({username}:***)"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateRepoRequest {
    pub name: String,
    pub private: bool,
    pub description: String,
}

impl CreateRepoRequest {
    pub fn new(name: impl Into<String>, private: bool) -> Self {
        Self {
            name: name.into(),
            private,
            description: REPO_DESCRIPTION.to_string(),
        }
    }
}

/// The three hosting endpoints the publisher needs. Calls are blocking and
/// never fail; transport problems come back as a 503 response.
pub trait HostingApi: Send + Sync {
    fn current_user(&self, auth: &ApiAuth) -> ApiResponse;

    fn get_repo(&self, auth: &ApiAuth, owner: &str, repo: &str) -> ApiResponse;

    fn create_repo(&self, auth: &ApiAuth, request: &CreateRepoRequest) -> ApiResponse;
}

pub struct UreqHostingApi {
    agent: ureq::Agent,
    base_url: String,
}

impl UreqHostingApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .timeout_write(Duration::from_secs(30))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: &str, path: &str, auth: &ApiAuth) -> ureq::Request {
        let mut request = self
            .agent
            .request(method, &format!("{}{path}", self.base_url))
            .set("Accept", ACCEPT)
            .set("User-Agent", USER_AGENT);
        if let Some(header) = auth.header() {
            request = request.set("Authorization", &header);
        }
        request
    }
}

impl Default for UreqHostingApi {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl HostingApi for UreqHostingApi {
    fn current_user(&self, auth: &ApiAuth) -> ApiResponse {
        into_api_response(self.request("GET", "/user", auth).call())
    }

    fn get_repo(&self, auth: &ApiAuth, owner: &str, repo: &str) -> ApiResponse {
        let path = format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        );
        into_api_response(self.request("GET", &path, auth).call())
    }

    fn create_repo(&self, auth: &ApiAuth, request: &CreateRepoRequest) -> ApiResponse {
        let body = match serde_json::to_string(request) {
            Ok(body) => body,
            Err(error) => return ApiResponse::new(400, format!("invalid request body: {error}")),
        };
        into_api_response(
            self.request("POST", "/user/repos", auth)
                .set("Content-Type", "application/json")
                .send_string(&body),
        )
    }
}

fn into_api_response(result: Result<ureq::Response, ureq::Error>) -> ApiResponse {
    match result {
        Ok(response) => {
            let status = response.status();
            let body = response.into_string().unwrap_or_default();
            ApiResponse::new(status, body)
        }
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            ApiResponse::new(status, body)
        }
        Err(ureq::Error::Transport(transport)) => ApiResponse::network_error(transport),
    }
}
