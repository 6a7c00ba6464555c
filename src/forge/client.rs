//! Forge Client — a typed wrapper around GitHub's REST API (spec.md §4.1).
//!
//! The teacher (`worktrunk`) is a synchronous, single-threaded CLI with no
//! async runtime in its dependency stack; this client stays synchronous too,
//! using `reqwest::blocking` rather than introducing `tokio` just for forge
//! calls, matching spec.md §5's single-threaded execution model.

use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use super::credentials::{Credential, source_credential};
use super::error::{Existence, ForgeError, OwnerKind, TokenValidity};
use crate::planlist::Visibility;

const DEFAULT_HOST: &str = "github.com";
const USER_AGENT_VALUE: &str = "repofleet";

/// Derive the REST API base URL for a forge host. `github.com` talks to the
/// dedicated `api.github.com` host; any other host is treated as a GitHub
/// Enterprise Server instance, which serves the same REST surface under
/// `/api/v3` on the host itself (spec.md §4.1, `forge-host` override).
fn api_base_for(host: &str) -> String {
    if host == DEFAULT_HOST {
        format!("https://api.{DEFAULT_HOST}")
    } else {
        format!("https://{host}/api/v3")
    }
}

/// Whether the client has a usable credential.
enum Mode {
    Live { http: HttpClient, credential: Credential },
    ReadOnlyLocal,
}

pub struct Client {
    mode: Mode,
    api_base: String,
}

#[derive(Deserialize)]
struct UserInfo {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Deserialize)]
struct RefInfo {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

impl Client {
    /// Build a client against the default forge (`github.com`), sourcing
    /// credentials from the environment or the system credential helper. If
    /// no credential is available, the client enters read-only-local mode
    /// (spec.md §4.1): all probes return [`ForgeError::NetworkError`] and
    /// callers must treat `OwnerRepo` entries as "skip with warning".
    pub fn new() -> Self {
        Self::with_config(DEFAULT_HOST, None)
    }

    /// Build a client against `host` (`config.toml`'s `forge-host`,
    /// overridable per spec.md §4.1), sourcing credentials from
    /// `token_env` (`config.toml`'s `github-token-env`) if set, else the
    /// usual `GH_TOKEN`/`GITHUB_TOKEN`/credential-helper order.
    pub fn with_config(host: &str, token_env: Option<&str>) -> Self {
        let api_base = api_base_for(host);
        match source_credential(host, token_env) {
            Some(credential) => {
                let mut headers = HeaderMap::new();
                headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
                headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
                let auth = format!("Bearer {}", credential.token);
                if let Ok(mut value) = HeaderValue::from_str(&auth) {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                let http = HttpClient::builder()
                    .default_headers(headers)
                    .build()
                    .unwrap_or_else(|_| HttpClient::new());
                Self {
                    mode: Mode::Live { http, credential },
                    api_base,
                }
            }
            None => Self {
                mode: Mode::ReadOnlyLocal,
                api_base,
            },
        }
    }

    pub fn is_read_only_local(&self) -> bool {
        matches!(self.mode, Mode::ReadOnlyLocal)
    }

    fn http(&self) -> Result<&HttpClient, ForgeError> {
        match &self.mode {
            Mode::Live { http, .. } => Ok(http),
            Mode::ReadOnlyLocal => Err(ForgeError::NetworkError),
        }
    }

    /// Validate the current credential. Called before the first
    /// repo-creation attempt in a run (spec.md §4.1). An empty/malformed
    /// response is treated as a transient network issue (allow retry); a
    /// response containing `"Bad credentials"` or `"Requires
    /// authentication"` is hard-invalid.
    pub fn validate_token(&self) -> Result<TokenValidity, ForgeError> {
        let http = self.http()?;
        let resp = http
            .get(format!("{}/user", self.api_base))
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        let status = resp.status();
        let body = resp.text().unwrap_or_default();

        if body.is_empty() {
            return Err(ForgeError::NetworkError);
        }
        if body.contains("Bad credentials") || body.contains("Requires authentication") {
            return Ok(TokenValidity::Invalid {
                reason: body.trim().to_string(),
            });
        }
        if status.is_success() {
            return Ok(TokenValidity::Valid);
        }
        Err(ForgeError::Api {
            code: status.as_u16(),
            message: body,
        })
    }

    /// Classify an owner as a user or organization account (spec.md §4.1).
    /// If the response lacks a `type` field, returns `Unknown` — callers
    /// (the Reconciler) log and skip creation in that case.
    pub fn classify_owner(&self, owner: &str) -> Result<OwnerKind, ForgeError> {
        let http = self.http()?;
        let resp = http
            .get(format!("{}/users/{owner}", self.api_base))
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        if !resp.status().is_success() {
            return Ok(OwnerKind::Unknown);
        }
        let info: UserInfo = resp.json().map_err(|_| ForgeError::NetworkError)?;
        Ok(match info.kind.as_deref() {
            Some("User") => OwnerKind::User,
            Some("Organization") => OwnerKind::Organization,
            _ => OwnerKind::Unknown,
        })
    }

    /// Probe whether `owner/repo` exists. A 404 here followed by a 201 from
    /// [`Client::create_repo`] is the success path (spec.md §4.1).
    pub fn repo_exists(&self, owner: &str, repo: &str) -> Result<Existence, ForgeError> {
        let http = self.http()?;
        let resp = http
            .get(format!("{}/repos/{owner}/{repo}", self.api_base))
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        match resp.status().as_u16() {
            200 => Ok(Existence::Exists),
            404 => Ok(Existence::NotFound),
            code => Err(ForgeError::Api {
                code,
                message: resp.text().unwrap_or_default(),
            }),
        }
    }

    /// Create `owner/repo` with the given visibility. The creation endpoint
    /// depends on owner classification: organizations create under
    /// `/orgs/{owner}/repos`, users (or `Unknown`, conservatively) under
    /// `/user/repos` with an explicit `name`.
    pub fn create_repo(
        &self,
        owner: &str,
        repo: &str,
        visibility: Visibility,
        auto_init: bool,
        owner_kind: OwnerKind,
    ) -> Result<(), ForgeError> {
        let http = self.http()?;
        let private = !matches!(visibility, Visibility::Public);
        let body = serde_json::json!({
            "name": repo,
            "private": private,
            "auto_init": auto_init,
        });
        let url = match owner_kind {
            OwnerKind::Organization => format!("{}/orgs/{owner}/repos", self.api_base),
            OwnerKind::User | OwnerKind::Unknown => format!("{}/user/repos", self.api_base),
        };
        let resp = http
            .post(url)
            .json(&body)
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        if resp.status().as_u16() == 201 {
            return Ok(());
        }
        Err(ForgeError::Api {
            code: resp.status().as_u16(),
            message: resp.text().unwrap_or_default(),
        })
    }

    /// Whether `branch` exists in `owner/repo`.
    pub fn branch_exists(&self, owner: &str, repo: &str, branch: &str) -> Result<Existence, ForgeError> {
        let http = self.http()?;
        let resp = http
            .get(format!("{}/repos/{owner}/{repo}/branches/{branch}", self.api_base))
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        match resp.status().as_u16() {
            200 => Ok(Existence::Exists),
            404 => Ok(Existence::NotFound),
            code => Err(ForgeError::Api {
                code,
                message: resp.text().unwrap_or_default(),
            }),
        }
    }

    /// Create `branch` in `owner/repo`, anchored at the default branch's
    /// tip SHA. Reads the default branch via a separate call; if that probe
    /// fails, branch creation fails without attempting a write (spec.md
    /// §4.1).
    pub fn create_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<(), ForgeError> {
        let http = self.http()?;

        let repo_resp = http
            .get(format!("{}/repos/{owner}/{repo}", self.api_base))
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        if !repo_resp.status().is_success() {
            return Err(ForgeError::Api {
                code: repo_resp.status().as_u16(),
                message: "could not read default branch".to_string(),
            });
        }
        let repo_info: RepoInfo = repo_resp.json().map_err(|_| ForgeError::NetworkError)?;

        let tip_resp = http
            .get(format!(
                "{}/repos/{owner}/{repo}/git/ref/heads/{}",
                self.api_base, repo_info.default_branch
            ))
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        if !tip_resp.status().is_success() {
            return Err(ForgeError::Api {
                code: tip_resp.status().as_u16(),
                message: "could not read default branch tip sha".to_string(),
            });
        }
        let ref_info: RefInfo = tip_resp.json().map_err(|_| ForgeError::NetworkError)?;

        let body = serde_json::json!({
            "ref": format!("refs/heads/{branch}"),
            "sha": ref_info.object.sha,
        });
        let create_resp = http
            .post(format!("{}/repos/{owner}/{repo}/git/refs", self.api_base))
            .json(&body)
            .send()
            .map_err(|_| ForgeError::NetworkError)?;
        if create_resp.status().as_u16() == 201 {
            return Ok(());
        }
        Err(ForgeError::Api {
            code: create_resp.status().as_u16(),
            message: create_resp.text().unwrap_or_default(),
        })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
