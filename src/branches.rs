// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Count commits per author across every branch in the window, each SHA once
// role: aggregation/branches
// inputs: GithubClient, ReportWindow
// outputs: CommitTally (per-author counts in first-seen order, unique commit total)
// invariants:
// - One HashSet of SHAs spans the whole aggregation; a SHA reachable from several branches counts once
// - Branches are walked in listing order, one at a time
// errors: Listing failures propagate; cancellation returns the tally so far with cancelled = true
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::enrichment::commits::{branch_commits_request, commit_author};
use crate::error::{PartialEnrichment, Result};
use crate::github::api::ApiRequest;
use crate::github::client::GithubClient;
use crate::github::wire::{WireBranch, WireCommit};
use crate::model::ReportWindow;
use crate::pagination::fetch_all;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitTally {
  pub by_author: IndexMap<String, u64>,
  pub unique_commits: u64,
  pub branches_scanned: u64,
  pub cancelled: bool,
  /// Listings cut short by the page ceiling.
  pub warnings: Vec<PartialEnrichment>,
}

pub async fn count_commits_by_author(client: &GithubClient, window: &ReportWindow) -> Result<CommitTally> {
  let mut tally = CommitTally::default();

  let branches = fetch_all::<WireBranch>(client, ApiRequest::new(client.repo_path("/branches"))).await?;
  if branches.cancelled {
    tally.cancelled = true;
    return Ok(tally);
  }
  tally
    .warnings
    .extend(branches.truncation(&client.slug(), "branches"));

  let mut seen: HashSet<String> = HashSet::new();

  for branch in branches.items {
    let listed = fetch_all::<WireCommit>(client, branch_commits_request(client, window, &branch.name)).await?;
    tally.branches_scanned += 1;
    tally
      .warnings
      .extend(listed.truncation(&format!("{} branch {}", client.slug(), branch.name), "commits"));

    let mut fresh = 0u64;
    for commit in &listed.items {
      if seen.insert(commit.sha.clone()) {
        *tally.by_author.entry(commit_author(commit)).or_insert(0) += 1;
        fresh += 1;
      }
    }
    tally.unique_commits += fresh;
    debug!(branch = %branch.name, listed = listed.items.len(), fresh, "branch scanned");

    if listed.cancelled || client.is_cancelled() {
      tally.cancelled = true;
      break;
    }
  }

  info!(
    branches = tally.branches_scanned,
    unique_commits = tally.unique_commits,
    "cross-branch commit tally complete"
  );
  Ok(tally)
}
