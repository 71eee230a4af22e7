// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Collect default-branch commits for the window and optionally enrich each with stats and CI outcome
// role: enrichment/commits
// inputs: GithubClient, ReportWindow, default branch name, details flag
// outputs: CommitHistory (records in API order, warnings, cancelled flag)
// invariants:
// - Author is the linked account login, else the raw git author name, else "unknown"
// - A commit with more than one parent is a merge
// - Detail enrichment joins stats and check runs; either may fail alone
// - PR association is looked up only for non-merge commits no collected PR accounts for
// errors: Listing failures propagate; detail failures become PartialEnrichment
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use tracing::{debug, info};

use super::pull_requests::ci_outcome;
use super::{settle, Enriched};
use crate::error::{AnalyzeError, PartialEnrichment, Result};
use crate::github::api::ApiRequest;
use crate::github::client::GithubClient;
use crate::github::wire::{WireAssociatedPull, WireCheckRuns, WireCommit};
use crate::model::{CommitRecord, ReportWindow};
use crate::pagination::fetch_all;
use crate::util::{iso, login_or_unknown};

#[derive(Debug, Default)]
pub struct CommitHistory {
  pub records: Vec<CommitRecord>,
  pub warnings: Vec<PartialEnrichment>,
  pub cancelled: bool,
}

pub fn commit_author(wire: &WireCommit) -> String {
  login_or_unknown([
    wire.author.as_ref().map(|u| u.login.as_str()),
    wire.commit.author.as_ref().and_then(|a| a.name.as_deref()),
  ])
}

pub fn commit_record(wire: WireCommit) -> Result<CommitRecord> {
  let author = commit_author(&wire);
  let timestamp = wire
    .commit
    .author
    .as_ref()
    .and_then(|a| a.date)
    .or_else(|| wire.commit.committer.as_ref().and_then(|c| c.date))
    .ok_or_else(|| AnalyzeError::fatal(format!("commit {}", wire.sha), "commit carries no author or committer date"))?;

  Ok(CommitRecord {
    is_merge: wire.parents.len() > 1,
    author,
    message: wire.commit.message,
    timestamp,
    additions: wire.stats.as_ref().map(|s| s.additions),
    deletions: wire.stats.as_ref().map(|s| s.deletions),
    ci_outcome: None,
    merged_pulls: Vec::new(),
    sha: wire.sha,
  })
}

/// `/commits?sha=..&since=..&until=..` request for one branch.
pub fn branch_commits_request(client: &GithubClient, window: &ReportWindow, branch: &str) -> ApiRequest {
  ApiRequest::new(client.repo_path("/commits"))
    .query("sha", branch)
    .query("since", iso(window.since))
    .query("until", iso(window.until))
}

/// Stats from the commit detail plus the commit's check-run outcome.
pub async fn enrich_commit(client: &GithubClient, mut record: CommitRecord) -> Enriched<CommitRecord> {
  let item = format!("{} commit {}", client.slug(), record.sha);

  let (detail, checks) = tokio::join!(
    client.get_json::<WireCommit>(ApiRequest::new(client.repo_path(&format!("/commits/{}", record.sha)))),
    client.get_json::<WireCheckRuns>(
      ApiRequest::new(client.repo_path(&format!("/commits/{}/check-runs", record.sha))).query("per_page", 100)
    ),
  );

  let mut warnings = Vec::new();
  if let Some(stats) = settle(&item, "stats", detail, &mut warnings).and_then(|d| d.stats) {
    record.additions = Some(stats.additions);
    record.deletions = Some(stats.deletions);
  }
  if let Some(runs) = settle(&item, "check_runs", checks, &mut warnings) {
    record.ci_outcome = Some(ci_outcome(&runs.check_runs));
  }

  Enriched { record, warnings }
}

pub async fn default_branch_history(
  client: &GithubClient,
  window: &ReportWindow,
  branch: &str,
  details: bool,
) -> Result<CommitHistory> {
  let listed = fetch_all::<WireCommit>(client, branch_commits_request(client, window, branch)).await?;
  let mut history = CommitHistory {
    cancelled: listed.cancelled,
    ..CommitHistory::default()
  };
  let scope = format!("{} branch {}", client.slug(), branch);
  history.warnings.extend(listed.truncation(&scope, "commits"));

  let records = listed
    .items
    .into_iter()
    .map(commit_record)
    .collect::<Result<Vec<_>>>()?;

  info!(branch, commits = records.len(), details, "default branch commits listed");

  if !details {
    history.records = records;
    return Ok(history);
  }

  for record in records {
    if client.is_cancelled() {
      history.cancelled = true;
      history.records.push(record);
      continue;
    }
    let enriched = enrich_commit(client, record).await;
    history.warnings.extend(enriched.warnings);
    history.records.push(enriched.record);
  }

  Ok(history)
}

/// Ask GitHub which merged pull requests introduced each non-merge commit that
/// `known` does not cover. A PR opened before the window but merged inside it is
/// never listed, so its squash or rebase commits are only matched here.
pub async fn associate_pull_requests(client: &GithubClient, history: &mut CommitHistory, known: &HashSet<&str>) {
  for record in history
    .records
    .iter_mut()
    .filter(|r| !r.is_merge && !known.contains(r.sha.as_str()))
  {
    if client.is_cancelled() {
      history.cancelled = true;
      return;
    }

    let item = format!("{} commit {}", client.slug(), record.sha);
    let res = client
      .get_json::<Vec<WireAssociatedPull>>(
        ApiRequest::new(client.repo_path(&format!("/commits/{}/pulls", record.sha))).query("per_page", 100),
      )
      .await;

    if let Some(pulls) = settle(&item, "pull_requests", res, &mut history.warnings) {
      record.merged_pulls = pulls
        .into_iter()
        .filter(|p| p.merged_at.is_some())
        .map(|p| p.number)
        .collect();
      if !record.merged_pulls.is_empty() {
        debug!(sha = %record.sha, pulls = ?record.merged_pulls, "commit arrived through an earlier pull request");
      }
    }
  }
}
