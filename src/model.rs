// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the JSON report model (pull requests, commits, issues, contributor ledger, summary)
// role: model/types
// outputs: Serializable structs with stable field names; timestamps as RFC 3339 UTC strings
// invariants:
// - summary.contributors_active == contributors.len(); summary.prs_opened == pull_requests.len()
// - summary.issues_opened + summary.issues_closed == issues.len()
// - All counters are unsigned
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PartialEnrichment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiOutcome {
  Success,
  Failure,
  Pending,
  Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
  pub since: DateTime<Utc>,
  pub until: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRecord {
  pub number: u64,
  pub title: String,
  pub author: String,
  pub created_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub closed_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub merged_at: Option<DateTime<Utc>>,
  pub additions: u64,
  pub deletions: u64,
  pub files_changed: u64,
  pub commit_count: u64,
  pub review_count: u64,
  pub reviewers: Vec<String>,
  pub comment_count: u64,
  pub ci_outcome: CiOutcome,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub linked_issue: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub merge_commit_sha: Option<String>,
  pub url: String,
  /// SHAs of the PR's own commits; used to tell PR work from direct pushes.
  #[serde(skip)]
  pub commit_shas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
  pub sha: String,
  pub author: String,
  pub message: String,
  pub timestamp: DateTime<Utc>,
  pub is_merge: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ci_outcome: Option<CiOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub additions: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deletions: Option<u64>,
  /// Merged PRs GitHub associates with this commit, when looked up.
  #[serde(skip)]
  pub merged_pulls: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
  pub number: u64,
  pub title: String,
  pub author: String,
  pub created_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub closed_at: Option<DateTime<Utc>>,
  pub is_closed: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_response_seconds: Option<u64>,
  pub assignees: Vec<String>,
  pub labels: Vec<String>,
  pub linked_pull_requests: Vec<u64>,
  pub comment_count: u64,
  pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorLedgerEntry {
  pub login: String,
  pub commits: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commits_all_branches: Option<u64>,
  pub pull_requests: u64,
  pub reviews: u64,
  pub issues: u64,
  pub direct_pushes: u64,
}

impl ContributorLedgerEntry {
  pub fn new(login: &str) -> Self {
    ContributorLedgerEntry {
      login: login.to_string(),
      commits: 0,
      commits_all_branches: None,
      pull_requests: 0,
      reviews: 0,
      issues: 0,
      direct_pushes: 0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
  pub prs_opened: u64,
  pub prs_merged: u64,
  /// Reviewed PRs over all PRs, in [0, 1]; 0 when there are no PRs.
  pub pct_prs_reviewed: f64,
  pub commits_default_branch: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commits_all_branches: Option<u64>,
  pub direct_pushes: u64,
  /// Issues created in the window that are still open.
  pub issues_opened: u64,
  pub issues_closed: u64,
  pub contributors_active: u64,
  pub lines_added: u64,
  pub lines_deleted: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub median_hours_to_merge: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub median_hours_to_first_response: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
  pub repository: String,
  pub window: ReportWindow,
  pub summary: Summary,
  pub contributors: Vec<ContributorLedgerEntry>,
  pub pull_requests: Vec<PullRequestRecord>,
  pub commits: Vec<CommitRecord>,
  pub issues: Vec<IssueRecord>,
  /// True when the run was cancelled and the collections are incomplete.
  pub partial: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<PartialEnrichment>,
}
