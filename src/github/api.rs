// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Transport seam for the GitHub REST API (token discovery, HTTP backend, fixture backend)
// role: github/transport
// inputs: ApiRequest (path + query); env GITHUB_TOKEN / GH_TOKEN; optional `gh` CLI; env GHAR_FIXTURES
// outputs: Raw ApiResponse (status, body, rate-limit headers); classification happens in client.rs
// side_effects: Network calls via ureq on the blocking pool; spawns `gh` subprocess for token fallback
// invariants:
// - Transport never interprets status codes; any HTTP status is returned as an ApiResponse
// - Fixture keys are `path?k=v&...` with query pairs sorted by key
// errors: TransportError only for connection-level failures (DNS, reset, timeout)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const FIXTURES_ENV: &str = "GHAR_FIXTURES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
  pub path: String,
  pub query: Vec<(String, String)>,
}

impl ApiRequest {
  pub fn new(path: impl Into<String>) -> Self {
    ApiRequest {
      path: path.into(),
      query: Vec::new(),
    }
  }

  pub fn query(mut self, key: &str, value: impl ToString) -> Self {
    self.query.retain(|(k, _)| k != key);
    self.query.push((key.to_string(), value.to_string()));
    self
  }

  /// Stable identity of the request: path plus query pairs sorted by key.
  pub fn key(&self) -> String {
    if self.query.is_empty() {
      return self.path.clone();
    }
    let mut pairs: Vec<&(String, String)> = self.query.iter().collect();
    pairs.sort();
    let qs: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", self.path, qs.join("&"))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
  pub status: u16,
  pub body: String,
  pub retry_after: Option<Duration>,
  pub rate_limit_remaining: Option<u64>,
}

impl ApiResponse {
  pub fn ok(body: impl Into<String>) -> Self {
    ApiResponse {
      status: 200,
      body: body.into(),
      retry_after: None,
      rate_limit_remaining: None,
    }
  }

  pub fn status(status: u16, body: impl Into<String>) -> Self {
    ApiResponse {
      status,
      ..ApiResponse::ok(body)
    }
  }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

// --- Trait seam for GitHub API ---
#[async_trait]
pub trait GithubApi: Send + Sync {
  async fn get(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Discover a GitHub token: explicit value, then env vars, then `gh auth token`.
pub fn discover_token(explicit: Option<String>) -> Option<String> {
  if let Some(t) = explicit {
    if !t.trim().is_empty() {
      return Some(t.trim().to_string());
    }
  }

  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

pub struct HttpApi {
  agent: ureq::Agent,
  base_url: String,
  token: Option<String>,
}

impl HttpApi {
  pub fn new(base_url: &str, token: Option<String>, call_timeout: Duration) -> Self {
    let agent: ureq::Agent = ureq::Agent::config_builder()
      .timeout_global(Some(call_timeout))
      .http_status_as_error(false)
      .build()
      .into();

    HttpApi {
      agent,
      base_url: base_url.trim_end_matches('/').to_string(),
      token,
    }
  }
}

fn header_u64(headers: &ureq::http::HeaderMap, name: &str) -> Option<u64> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse::<u64>().ok())
}

fn get_blocking(
  agent: &ureq::Agent,
  url: &str,
  query: &[(String, String)],
  token: Option<&str>,
) -> Result<ApiResponse, TransportError> {
  let mut req = agent
    .get(url)
    .header("Accept", "application/vnd.github+json")
    .header("User-Agent", "github-activity-report")
    .header("X-GitHub-Api-Version", "2022-11-28");

  for (k, v) in query {
    req = req.query(k, v);
  }

  if let Some(t) = token {
    req = req.header("Authorization", &format!("Bearer {}", t));
  }

  let mut resp = req.call().map_err(|e| TransportError(e.to_string()))?;

  let status = resp.status().as_u16();
  let retry_after = header_u64(resp.headers(), "retry-after").map(Duration::from_secs);
  let rate_limit_remaining = header_u64(resp.headers(), "x-ratelimit-remaining");
  let body = resp
    .body_mut()
    .read_to_string()
    .map_err(|e| TransportError(format!("reading body: {}", e)))?;

  Ok(ApiResponse {
    status,
    body,
    retry_after,
    rate_limit_remaining,
  })
}

#[async_trait]
impl GithubApi for HttpApi {
  async fn get(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
    let agent = self.agent.clone();
    let url = format!("{}{}", self.base_url, request.path);
    let query = request.query.clone();
    let token = self.token.clone();

    tokio::task::spawn_blocking(move || get_blocking(&agent, &url, &query, token.as_deref()))
      .await
      .map_err(|e| TransportError(format!("request task failed: {}", e)))?
  }
}

/// In-memory backend keyed by `ApiRequest::key()`. Each key holds a queue of
/// responses; the last one repeats. Unknown keys answer 404.
#[derive(Default)]
pub struct FixtureApi {
  routes: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
  calls: Mutex<Vec<String>>,
}

impl FixtureApi {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a JSON object mapping request keys to 200 response bodies.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    use anyhow::Context;

    let data = std::fs::read_to_string(path).with_context(|| format!("reading fixtures {}", path.display()))?;
    let map: serde_json::Map<String, serde_json::Value> =
      serde_json::from_str(&data).with_context(|| format!("parsing fixtures {}", path.display()))?;

    let api = FixtureApi::new();
    for (key, body) in map {
      api.route(&key, body);
    }
    Ok(api)
  }

  pub fn route(&self, key: &str, body: serde_json::Value) -> &Self {
    self.respond(key, ApiResponse::ok(body.to_string()))
  }

  pub fn respond(&self, key: &str, response: ApiResponse) -> &Self {
    if let Ok(mut routes) = self.routes.lock() {
      routes.entry(key.to_string()).or_default().push_back(response);
    }
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().map(|c| c.clone()).unwrap_or_default()
  }
}

#[async_trait]
impl GithubApi for FixtureApi {
  async fn get(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
    let key = request.key();

    if let Ok(mut calls) = self.calls.lock() {
      calls.push(key.clone());
    }

    let mut routes = self
      .routes
      .lock()
      .map_err(|_| TransportError("fixture routes poisoned".into()))?;

    let response = match routes.get_mut(&key) {
      Some(queue) if queue.len() > 1 => queue.pop_front(),
      Some(queue) => queue.front().cloned(),
      None => None,
    };

    Ok(response.unwrap_or_else(|| ApiResponse::status(404, r#"{"message":"Not Found"}"#)))
  }
}
