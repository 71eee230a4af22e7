// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed boundary structs for GitHub REST responses with per-field defaulting
// role: github/wire
// outputs: Deserialize-only structs consumed by pagination, enrichment and aggregation
// invariants:
// - Identity fields (number, sha, created_at) are required; a missing one is an unexpected shape
// - Counters and lists default to zero/empty; nullable fields are Option
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::pagination::CreatedAt;

#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
  pub login: String,
  #[serde(rename = "type", default)]
  pub kind: Option<String>,
}

impl WireUser {
  pub fn is_bot(&self) -> bool {
    self.login.ends_with("[bot]") || self.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("bot"))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRepository {
  pub default_branch: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireRef {
  #[serde(default)]
  pub sha: String,
  #[serde(rename = "ref", default)]
  pub name: String,
}

/// Pull request returned by `/commits/{sha}/pulls`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireAssociatedPull {
  pub number: u64,
  pub merged_at: Option<DateTime<Utc>>,
}

/// Pull request as it appears in the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePullSummary {
  pub number: u64,
  #[serde(default)]
  pub title: String,
  pub user: Option<WireUser>,
  pub created_at: DateTime<Utc>,
  pub closed_at: Option<DateTime<Utc>>,
  pub merged_at: Option<DateTime<Utc>>,
  pub body: Option<String>,
  #[serde(default)]
  pub html_url: String,
}

impl CreatedAt for WirePullSummary {
  fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }
}

/// Pull request detail endpoint; carries the summary counters.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePullDetail {
  pub number: u64,
  #[serde(default)]
  pub additions: u64,
  #[serde(default)]
  pub deletions: u64,
  #[serde(default)]
  pub changed_files: u64,
  #[serde(default)]
  pub commits: u64,
  #[serde(default)]
  pub comments: u64,
  pub closed_at: Option<DateTime<Utc>>,
  pub merged_at: Option<DateTime<Utc>>,
  pub merge_commit_sha: Option<String>,
  #[serde(default)]
  pub head: WireRef,
  pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireFile {
  #[serde(default)]
  pub filename: String,
  #[serde(default)]
  pub additions: u64,
  #[serde(default)]
  pub deletions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSha {
  pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireReview {
  pub user: Option<WireUser>,
  #[serde(default)]
  pub state: String,
  pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireComment {
  pub user: Option<WireUser>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireCheckRuns {
  #[serde(default)]
  pub total_count: u64,
  #[serde(default)]
  pub check_runs: Vec<WireCheckRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireCheckRun {
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLabel {
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireIssue {
  pub number: u64,
  #[serde(default)]
  pub title: String,
  pub user: Option<WireUser>,
  pub created_at: DateTime<Utc>,
  pub closed_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub comments: u64,
  #[serde(default)]
  pub assignees: Vec<WireUser>,
  #[serde(default)]
  pub labels: Vec<WireLabel>,
  #[serde(default)]
  pub html_url: String,
  /// Present when the "issue" is really a pull request.
  #[serde(default)]
  pub pull_request: Option<serde_json::Value>,
}

impl CreatedAt for WireIssue {
  fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireGitIdentity {
  #[serde(default)]
  pub name: Option<String>,
  pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireGitCommit {
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub author: Option<WireGitIdentity>,
  #[serde(default)]
  pub committer: Option<WireGitIdentity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireStats {
  #[serde(default)]
  pub additions: u64,
  #[serde(default)]
  pub deletions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCommit {
  pub sha: String,
  #[serde(default)]
  pub commit: WireGitCommit,
  pub author: Option<WireUser>,
  #[serde(default)]
  pub parents: Vec<WireSha>,
  #[serde(default)]
  pub stats: Option<WireStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireBranch {
  pub name: String,
  pub commit: WireSha,
}
