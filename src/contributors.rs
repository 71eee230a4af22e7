// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fold PRs, commits, issues and the optional branch tally into the contributor ledger and the summary
// role: aggregation/contributors
// inputs: Enriched PullRequestRecords, default-branch CommitRecords, IssueRecords, Option<CommitTally>
// outputs: (Vec<ContributorLedgerEntry>, Summary)
// invariants:
// - Logins are exact, case-sensitive keys; ledger order is first arrival (PRs, reviews, commits, issues)
// - Only the PR, commit and issue streams create entries; the branch tally fills commits_all_branches
// - Bots are dropped after folding, so their activity never creates or shifts a ledger entry
// - Direct push: non-merge default-branch commit in no PR's commit list, not a PR merge commit, with no associated merged PR
// - pct_prs_reviewed is 0 when there are no PRs
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::branches::CommitTally;
use crate::model::{CommitRecord, ContributorLedgerEntry, IssueRecord, PullRequestRecord, Summary};
use crate::util::{is_bot_login, median, round2};

fn entry<'a>(ledger: &'a mut IndexMap<String, ContributorLedgerEntry>, login: &str) -> &'a mut ContributorLedgerEntry {
  ledger
    .entry(login.to_string())
    .or_insert_with(|| ContributorLedgerEntry::new(login))
}

/// SHAs that arrived through a pull request, either as PR commits or as the merge commit.
pub fn pull_request_shas(prs: &[PullRequestRecord]) -> HashSet<&str> {
  prs
    .iter()
    .flat_map(|pr| pr.commit_shas.iter().map(String::as_str).chain(pr.merge_commit_sha.as_deref()))
    .collect()
}

pub fn is_direct_push(commit: &CommitRecord, pr_shas: &HashSet<&str>) -> bool {
  !commit.is_merge && commit.merged_pulls.is_empty() && !pr_shas.contains(commit.sha.as_str())
}

pub fn build(
  prs: &[PullRequestRecord],
  commits: &[CommitRecord],
  issues: &[IssueRecord],
  tally: Option<&CommitTally>,
) -> (Vec<ContributorLedgerEntry>, Summary) {
  let mut ledger: IndexMap<String, ContributorLedgerEntry> = IndexMap::new();
  let pr_shas = pull_request_shas(prs);

  for pr in prs {
    entry(&mut ledger, &pr.author).pull_requests += 1;
    for reviewer in &pr.reviewers {
      entry(&mut ledger, reviewer).reviews += 1;
    }
  }

  let mut direct_pushes = 0u64;
  for c in commits {
    let e = entry(&mut ledger, &c.author);
    e.commits += 1;
    if is_direct_push(c, &pr_shas) {
      e.direct_pushes += 1;
      direct_pushes += 1;
    }
  }

  for issue in issues {
    entry(&mut ledger, &issue.author).issues += 1;
  }

  // The tally only annotates; a login seen on other branches alone gets no entry.
  if let Some(t) = tally {
    for e in ledger.values_mut() {
      e.commits_all_branches = Some(t.by_author.get(&e.login).copied().unwrap_or(0));
    }
  }

  let contributors: Vec<ContributorLedgerEntry> = ledger.into_values().filter(|e| !is_bot_login(&e.login)).collect();

  let prs_opened = prs.len() as u64;
  let reviewed = prs.iter().filter(|p| p.review_count > 0).count() as u64;
  let pct_prs_reviewed = if prs_opened == 0 {
    0.0
  } else {
    reviewed as f64 / prs_opened as f64
  };

  let mut merge_hours: Vec<f64> = prs
    .iter()
    .filter_map(|p| p.merged_at.map(|m| (m - p.created_at).num_seconds()))
    .filter(|s| *s >= 0)
    .map(|s| s as f64 / 3600.0)
    .collect();
  let mut response_hours: Vec<f64> = issues
    .iter()
    .filter_map(|i| i.first_response_seconds)
    .map(|s| s as f64 / 3600.0)
    .collect();

  let issues_closed = issues.iter().filter(|i| i.is_closed).count() as u64;

  let summary = Summary {
    prs_opened,
    prs_merged: prs.iter().filter(|p| p.merged_at.is_some()).count() as u64,
    pct_prs_reviewed,
    commits_default_branch: commits.len() as u64,
    commits_all_branches: tally.map(|t| t.unique_commits),
    direct_pushes,
    issues_opened: issues.len() as u64 - issues_closed,
    issues_closed,
    contributors_active: contributors.len() as u64,
    lines_added: prs.iter().map(|p| p.additions).sum(),
    lines_deleted: prs.iter().map(|p| p.deletions).sum(),
    median_hours_to_merge: median(&mut merge_hours).map(round2),
    median_hours_to_first_response: median(&mut response_hours).map(round2),
  };

  (contributors, summary)
}
