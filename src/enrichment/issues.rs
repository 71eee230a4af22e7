// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn issue listing items into IssueRecords with first-response latency and linked PR numbers
// role: enrichment/issues
// inputs: GithubClient; WireIssue from the listing; enriched PullRequestRecords for back-links
// outputs: Enriched<IssueRecord>
// invariants:
// - Listing items that are pull requests are dropped
// - First response is the earliest comment by anyone other than the author, bots excluded
// - Comments are only fetched when the listing reports some
// errors: Comment listing failures default first_response_seconds and emit PartialEnrichment
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use tracing::debug;

use super::{settle_listing, Enriched};
use crate::error::Result;
use crate::github::api::ApiRequest;
use crate::github::client::GithubClient;
use crate::github::wire::{WireComment, WireIssue};
use crate::model::{IssueRecord, PullRequestRecord};
use crate::pagination::fetch_all;
use crate::util::{diff_seconds, login_or_unknown};

/// Seconds from creation to the first non-author, non-bot comment.
pub fn first_response_seconds(issue: &WireIssue, author: &str, comments: &[WireComment]) -> Option<u64> {
  comments
    .iter()
    .filter(|c| match &c.user {
      Some(u) => u.login != author && !u.is_bot(),
      None => false,
    })
    .map(|c| c.created_at)
    .min()
    .and_then(|at| diff_seconds(issue.created_at, at))
}

pub async fn enrich_issue(client: &GithubClient, issue: WireIssue) -> Result<Option<Enriched<IssueRecord>>> {
  if issue.pull_request.is_some() {
    return Ok(None);
  }

  let item = format!("{} issue #{}", client.slug(), issue.number);
  let author = login_or_unknown([issue.user.as_ref().map(|u| u.login.as_str())]);
  let mut warnings = Vec::new();

  let first_response = if issue.comments > 0 {
    let listed = fetch_all::<WireComment>(
      client,
      ApiRequest::new(client.repo_path(&format!("/issues/{}/comments", issue.number))),
    )
    .await;

    settle_listing(&item, "comments", listed, &mut warnings).and_then(|c| first_response_seconds(&issue, &author, &c))
  } else {
    None
  };

  debug!(item = %item, ?first_response, "issue enriched");

  let is_closed = issue.closed_at.is_some() || issue.state.eq_ignore_ascii_case("closed");

  Ok(Some(Enriched {
    record: IssueRecord {
      number: issue.number,
      title: issue.title,
      author,
      created_at: issue.created_at,
      closed_at: issue.closed_at,
      is_closed,
      first_response_seconds: first_response,
      assignees: issue.assignees.into_iter().map(|u| u.login).collect(),
      labels: issue.labels.into_iter().map(|l| l.name).collect(),
      linked_pull_requests: Vec::new(),
      comment_count: issue.comments,
      url: issue.html_url,
    },
    warnings,
  }))
}

/// Fill each issue's `linked_pull_requests` from PRs whose body closes it.
pub fn link_pull_requests(issues: &mut [IssueRecord], prs: &[PullRequestRecord]) {
  for issue in issues.iter_mut() {
    let mut linked: Vec<u64> = prs
      .iter()
      .filter(|pr| pr.linked_issue == Some(issue.number))
      .map(|pr| pr.number)
      .collect();
    linked.sort_unstable();
    linked.dedup();
    issue.linked_pull_requests = linked;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::github::api::{ApiResponse, FixtureApi};
  use crate::model::CiOutcome;
  use crate::scheduler::policy::RetryPolicy;
  use crate::scheduler::{RequestBudget, Scheduler};
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;
  use tokio_util::sync::CancellationToken;

  fn client(api: Arc<FixtureApi>) -> GithubClient {
    let budget = RequestBudget {
      capacity: 1000,
      refill_amount: 1000,
      refill_interval: Duration::from_secs(1),
      min_spacing: Duration::ZERO,
      max_concurrent: 1,
    };
    let scheduler = Scheduler::new(budget, RetryPolicy::default(), CancellationToken::new()).unwrap();
    GithubClient::new(api, scheduler, "octo", "widgets")
  }

  fn issue(v: serde_json::Value) -> WireIssue {
    serde_json::from_value(v).unwrap()
  }

  const COMMENTS_KEY: &str = "/repos/octo/widgets/issues/3/comments?page=1&per_page=100";

  #[tokio::test]
  async fn pull_requests_in_issue_listing_are_dropped() {
    let api = Arc::new(FixtureApi::new());
    let wire = issue(json!({
      "number": 2, "created_at": "2024-01-02T00:00:00Z",
      "pull_request": { "url": "https://api.github.com/repos/octo/widgets/pulls/2" }
    }));
    assert!(enrich_issue(&client(api.clone()), wire).await.unwrap().is_none());
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn first_response_skips_author_and_bots() {
    let api = Arc::new(FixtureApi::new());
    api.route(
      COMMENTS_KEY,
      json!([
        { "user": { "login": "reporter" }, "created_at": "2024-01-02T00:10:00Z" },
        { "user": { "login": "github-actions[bot]", "type": "Bot" }, "created_at": "2024-01-02T00:20:00Z" },
        { "user": { "login": "maintainer" }, "created_at": "2024-01-02T02:00:00Z" }
      ]),
    );
    let wire = issue(json!({
      "number": 3, "title": "Crash", "user": { "login": "reporter" },
      "created_at": "2024-01-02T00:00:00Z", "state": "closed", "comments": 3,
      "closed_at": "2024-01-03T00:00:00Z",
      "assignees": [{ "login": "maintainer" }], "labels": [{ "name": "bug" }]
    }));

    let out = enrich_issue(&client(api), wire).await.unwrap().unwrap();
    let rec = out.record;
    assert_eq!(rec.first_response_seconds, Some(7200));
    assert!(rec.is_closed);
    assert_eq!(rec.assignees, vec!["maintainer".to_string()]);
    assert_eq!(rec.labels, vec!["bug".to_string()]);
    assert_eq!(rec.comment_count, 3);
  }

  #[tokio::test]
  async fn no_comments_means_no_fetch() {
    let api = Arc::new(FixtureApi::new());
    let wire = issue(json!({ "number": 3, "user": null, "created_at": "2024-01-02T00:00:00Z", "state": "open" }));

    let rec = enrich_issue(&client(api.clone()), wire).await.unwrap().unwrap().record;
    assert_eq!(rec.author, "unknown");
    assert!(!rec.is_closed);
    assert_eq!(rec.first_response_seconds, None);
    assert!(api.calls().is_empty());
  }

  #[tokio::test]
  async fn failed_comment_listing_is_partial() {
    let api = Arc::new(FixtureApi::new());
    api.respond(COMMENTS_KEY, ApiResponse::status(403, r#"{"message":"Resource not accessible"}"#));
    let wire = issue(json!({ "number": 3, "created_at": "2024-01-02T00:00:00Z", "comments": 1 }));

    let out = enrich_issue(&client(api), wire).await.unwrap().unwrap();
    assert_eq!(out.record.first_response_seconds, None);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].field, "comments");
  }

  fn pr(number: u64, linked: Option<u64>) -> PullRequestRecord {
    PullRequestRecord {
      number,
      title: String::new(),
      author: "a".into(),
      created_at: chrono::Utc::now(),
      closed_at: None,
      merged_at: None,
      additions: 0,
      deletions: 0,
      files_changed: 0,
      commit_count: 0,
      review_count: 0,
      reviewers: vec![],
      comment_count: 0,
      ci_outcome: CiOutcome::Unknown,
      linked_issue: linked,
      merge_commit_sha: None,
      url: String::new(),
      commit_shas: vec![],
    }
  }

  #[tokio::test]
  async fn back_links_collect_sorted_pr_numbers() {
    let api = Arc::new(FixtureApi::new());
    let wire = issue(json!({ "number": 42, "created_at": "2024-01-02T00:00:00Z" }));
    let rec = enrich_issue(&client(api), wire).await.unwrap().unwrap().record;

    let mut issues = vec![rec];
    link_pull_requests(&mut issues, &[pr(9, Some(42)), pr(3, Some(42)), pr(5, Some(7)), pr(6, None)]);
    assert_eq!(issues[0].linked_pull_requests, vec![3, 9]);
  }
}
