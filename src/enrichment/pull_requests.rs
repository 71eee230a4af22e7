// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Enrich one pull request: detail fetch, then a joined fan-out over files, commits, reviews, comments and check runs
// role: enrichment/github-pull-requests
// inputs: GithubClient; WirePullSummary from the listing
// outputs: Enriched<PullRequestRecord>
// side_effects: Six scheduled API calls per PR (more when sub-listings span pages)
// invariants:
// - Lines changed come from per-file data whenever the file listing succeeded
// - CI outcome priority: pending > failure > success > unknown
// - Linked issue: first short-form match wins over any URL-form match
// - Sub-fetch failures default their field and emit PartialEnrichment; siblings are never cancelled
// errors: Detail fetch failure is fatal for the run, except NotFound which drops the PR
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{settle, settle_listing, Enriched};
use crate::error::{AnalyzeError, Result};
use crate::github::api::ApiRequest;
use crate::github::client::GithubClient;
use crate::github::wire::{
  WireCheckRun, WireCheckRuns, WireComment, WireFile, WirePullDetail, WirePullSummary, WireReview, WireSha,
};
use crate::model::{CiOutcome, PullRequestRecord};
use crate::pagination::fetch_all;
use crate::util::login_or_unknown;

static RE_LINK_SHORT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\b(?:closes|close|fixes|fix|resolves|resolve)\s+#(\d+)\b").unwrap());
static RE_LINK_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\b(?:closes|close|fixes|fix|resolves|resolve)\s+https?://[\w.:-]+(?:/[\w.-]+)*?/[\w.-]+/[\w.-]+/issues/(\d+)\b")
    .unwrap()
});

/// Issue number closed by a PR body, per GitHub's closing keywords.
pub fn extract_linked_issue(body: Option<&str>) -> Option<u64> {
  let body = body?;

  [&*RE_LINK_SHORT, &*RE_LINK_URL].into_iter().find_map(|re| {
    re.captures_iter(body)
      .find_map(|c| c.get(1).and_then(|m| m.as_str().parse::<u64>().ok()))
  })
}

fn is_pending_status(status: &str) -> bool {
  matches!(
    status.to_ascii_lowercase().as_str(),
    "queued" | "in_progress" | "pending" | "waiting" | "requested"
  )
}

fn is_failure_conclusion(conclusion: &str) -> bool {
  matches!(
    conclusion.to_ascii_lowercase().as_str(),
    "failure" | "cancelled" | "timed_out"
  )
}

/// Fold check-run states into one outcome; pending beats failure beats success.
pub fn ci_outcome(runs: &[WireCheckRun]) -> CiOutcome {
  if runs.iter().any(|r| r.status.as_deref().is_some_and(is_pending_status)) {
    return CiOutcome::Pending;
  }
  if runs.iter().any(|r| r.conclusion.as_deref().is_some_and(is_failure_conclusion)) {
    return CiOutcome::Failure;
  }
  if runs
    .iter()
    .any(|r| r.conclusion.as_deref().is_some_and(|c| c.eq_ignore_ascii_case("success")))
  {
    return CiOutcome::Success;
  }
  CiOutcome::Unknown
}

pub fn lines_from_files(files: &[WireFile]) -> (u64, u64) {
  files
    .iter()
    .fold((0, 0), |(a, d), f| (a + f.additions, d + f.deletions))
}

/// Submitted reviews by someone other than the author: (count, unique logins in order).
fn submitted_reviews(reviews: &[WireReview], author: &str) -> (u64, Vec<String>) {
  let mut count = 0u64;
  let mut logins: Vec<String> = Vec::new();

  for r in reviews {
    if r.state.eq_ignore_ascii_case("PENDING") {
      continue;
    }
    let Some(login) = r.user.as_ref().map(|u| u.login.as_str()) else {
      count += 1;
      continue;
    };
    if login == author {
      continue;
    }
    count += 1;
    if !logins.iter().any(|l| l == login) {
      logins.push(login.to_string());
    }
  }

  (count, logins)
}

pub async fn enrich_pull(client: &GithubClient, summary: WirePullSummary) -> Result<Option<Enriched<PullRequestRecord>>> {
  let number = summary.number;
  let item = format!("{} pull #{}", client.slug(), number);

  // Phase 1: primary detail fetch
  let detail: WirePullDetail = match client
    .get_json(ApiRequest::new(client.repo_path(&format!("/pulls/{}", number))))
    .await
  {
    Ok(d) => d,
    Err(e @ AnalyzeError::NotFound { .. }) => {
      warn!(item = %item, error = %e, "pull request vanished between listing and detail; skipping");
      return Ok(None);
    }
    Err(e) => return Err(e),
  };

  // Phase 2: joined fan-out
  let head_sha = detail.head.sha.clone();
  let checks = async {
    if head_sha.is_empty() {
      return Ok(WireCheckRuns::default());
    }
    client
      .get_json::<WireCheckRuns>(
        ApiRequest::new(client.repo_path(&format!("/commits/{}/check-runs", head_sha))).query("per_page", 100),
      )
      .await
  };

  let (files, commits, reviews, comments, checks) = tokio::join!(
    fetch_all::<WireFile>(client, ApiRequest::new(client.repo_path(&format!("/pulls/{}/files", number)))),
    fetch_all::<WireSha>(client, ApiRequest::new(client.repo_path(&format!("/pulls/{}/commits", number)))),
    fetch_all::<WireReview>(client, ApiRequest::new(client.repo_path(&format!("/pulls/{}/reviews", number)))),
    fetch_all::<WireComment>(client, ApiRequest::new(client.repo_path(&format!("/issues/{}/comments", number)))),
    checks,
  );

  // Phase 3: settle each field independently
  let mut warnings = Vec::new();
  let files = settle_listing(&item, "files", files, &mut warnings);
  let commits = settle_listing(&item, "commits", commits, &mut warnings);
  let reviews = settle_listing(&item, "reviews", reviews, &mut warnings);
  let comments = settle_listing(&item, "comments", comments, &mut warnings);
  let checks = settle(&item, "check_runs", checks, &mut warnings);

  // Phase 4: derive
  let author = login_or_unknown([summary.user.as_ref().map(|u| u.login.as_str())]);

  let (additions, deletions, files_changed) = match &files {
    Some(f) => {
      let (a, d) = lines_from_files(f);
      (a, d, f.len() as u64)
    }
    None => (detail.additions, detail.deletions, detail.changed_files),
  };

  let commit_shas: Vec<String> = commits.unwrap_or_default().into_iter().map(|c| c.sha).collect();
  let commit_count = if commit_shas.is_empty() {
    detail.commits
  } else {
    commit_shas.len() as u64
  };

  let (review_count, reviewers) = reviews
    .as_deref()
    .map(|r| submitted_reviews(r, &author))
    .unwrap_or_default();

  let comment_count = comments.map(|c| c.len() as u64).unwrap_or(detail.comments);
  let ci = checks.map(|c| ci_outcome(&c.check_runs)).unwrap_or(CiOutcome::Unknown);
  let linked_issue = extract_linked_issue(summary.body.as_deref().or(detail.body.as_deref()));

  debug!(item = %item, ?ci, review_count, warnings = warnings.len(), "pull request enriched");

  Ok(Some(Enriched {
    record: PullRequestRecord {
      number,
      title: summary.title,
      author,
      created_at: summary.created_at,
      closed_at: detail.closed_at.or(summary.closed_at),
      merged_at: detail.merged_at.or(summary.merged_at),
      additions,
      deletions,
      files_changed,
      commit_count,
      review_count,
      reviewers,
      comment_count,
      ci_outcome: ci,
      linked_issue,
      merge_commit_sha: detail.merge_commit_sha.filter(|s| !s.is_empty()),
      url: summary.html_url,
      commit_shas,
    },
    warnings,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::github::api::{ApiResponse, FixtureApi};
  use crate::scheduler::policy::RetryPolicy;
  use crate::scheduler::{RequestBudget, Scheduler};
  use proptest::prelude::*;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;
  use tokio_util::sync::CancellationToken;

  fn run(status: Option<&str>, conclusion: Option<&str>) -> WireCheckRun {
    WireCheckRun {
      status: status.map(str::to_string),
      conclusion: conclusion.map(str::to_string),
    }
  }

  #[test]
  fn queued_beats_success() {
    let runs = [run(Some("queued"), None), run(None, Some("success"))];
    assert_eq!(ci_outcome(&runs), CiOutcome::Pending);
  }

  #[test]
  fn failure_and_cancelled_beat_success() {
    let runs = [
      run(Some("completed"), Some("success")),
      run(Some("completed"), Some("cancelled")),
    ];
    assert_eq!(ci_outcome(&runs), CiOutcome::Failure);
    assert_eq!(ci_outcome(&[run(Some("completed"), Some("success"))]), CiOutcome::Success);
    assert_eq!(ci_outcome(&[run(Some("completed"), Some("skipped"))]), CiOutcome::Unknown);
    assert_eq!(ci_outcome(&[]), CiOutcome::Unknown);
  }

  #[test]
  fn linked_issue_prefers_first_short_form() {
    assert_eq!(extract_linked_issue(Some("Fixes #42 and relates to #7")), Some(42));
    assert_eq!(extract_linked_issue(Some("see #7, then closes #9")), Some(9));
    assert_eq!(extract_linked_issue(Some("RESOLVE #3")), Some(3));
    assert_eq!(extract_linked_issue(Some("hotfix #3")), None);
    assert_eq!(extract_linked_issue(Some("no keywords here #5")), None);
    assert_eq!(extract_linked_issue(None), None);
  }

  #[test]
  fn short_form_wins_over_earlier_url_form() {
    let body = "Closes https://github.com/octo/widgets/issues/11\n\nAlso fixes #12";
    assert_eq!(extract_linked_issue(Some(body)), Some(12));
    assert_eq!(
      extract_linked_issue(Some("resolves https://github.com/octo/widgets/issues/11")),
      Some(11)
    );
  }

  #[test]
  fn url_form_matches_enterprise_hosts() {
    assert_eq!(
      extract_linked_issue(Some("Fixes https://ghe.example.com/octo/widgets/issues/21")),
      Some(21)
    );
    assert_eq!(
      extract_linked_issue(Some("closes http://git.internal:8443/octo/widgets/issues/4")),
      Some(4)
    );
    assert_eq!(extract_linked_issue(Some("fixes https://ghe.example.com/octo/widgets/pull/4")), None);
  }

  #[test]
  fn reviews_skip_author_and_pending() {
    let v = json!([
      { "user": { "login": "alice" }, "state": "APPROVED" },
      { "user": { "login": "author" }, "state": "COMMENTED" },
      { "user": { "login": "alice" }, "state": "COMMENTED" },
      { "user": { "login": "bob" }, "state": "PENDING" },
      { "user": { "login": "carol" }, "state": "CHANGES_REQUESTED" }
    ]);
    let reviews: Vec<WireReview> = serde_json::from_value(v).unwrap();
    let (count, logins) = submitted_reviews(&reviews, "author");
    assert_eq!(count, 3);
    assert_eq!(logins, vec!["alice".to_string(), "carol".to_string()]);
  }

  fn state_strategy() -> impl Strategy<Value = WireCheckRun> {
    let status = prop::option::of(prop::sample::select(vec!["queued", "in_progress", "completed"]));
    let conclusion = prop::option::of(prop::sample::select(vec!["success", "failure", "cancelled", "neutral"]));
    (status, conclusion).prop_map(|(s, c)| run(s, c))
  }

  proptest! {
    #[test]
    fn any_pending_run_forces_pending(mut runs in prop::collection::vec(state_strategy(), 0..8), pos in 0usize..8) {
      let idx = pos.min(runs.len());
      runs.insert(idx, run(Some("in_progress"), None));
      prop_assert_eq!(ci_outcome(&runs), CiOutcome::Pending);
    }
  }

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

  fn summary(number: u64) -> WirePullSummary {
    serde_json::from_value(json!({
      "number": number,
      "title": "Add widget",
      "user": { "login": "octocat" },
      "created_at": "2024-01-10T00:00:00Z",
      "body": "Fixes #42 and relates to #7",
      "html_url": format!("https://github.com/octo/widgets/pull/{}", number)
    }))
    .unwrap()
  }

  fn page(path: &str) -> String {
    format!("/repos/octo/widgets{}?page=1&per_page=100", path)
  }

  fn route_detail(api: &FixtureApi, number: u64) {
    api.route(
      &format!("/repos/octo/widgets/pulls/{}", number),
      json!({
        "number": number, "additions": 999, "deletions": 999, "changed_files": 9,
        "commits": 4, "comments": 6, "merged_at": "2024-01-11T00:00:00Z",
        "merge_commit_sha": "m1", "head": { "sha": "h1", "ref": "feature" }
      }),
    );
  }

  #[tokio::test]
  async fn enrich_sums_per_file_lines_and_derives_fields() {
    let api = Arc::new(FixtureApi::new());
    route_detail(&api, 5);
    api.route(
      &page("/pulls/5/files"),
      json!([
        { "filename": "a.rs", "additions": 10, "deletions": 2 },
        { "filename": "b.rs", "additions": 5, "deletions": 1 }
      ]),
    );
    api.route(&page("/pulls/5/commits"), json!([{ "sha": "c1" }, { "sha": "c2" }]));
    api.route(&page("/pulls/5/reviews"), json!([{ "user": { "login": "alice" }, "state": "APPROVED" }]));
    api.route(&page("/issues/5/comments"), json!([{ "user": { "login": "bob" }, "created_at": "2024-01-10T01:00:00Z" }]));
    api.route(
      "/repos/octo/widgets/commits/h1/check-runs?per_page=100",
      json!({ "total_count": 2, "check_runs": [{ "status": "queued" }, { "conclusion": "success" }] }),
    );

    let out = enrich_pull(&client(api), summary(5)).await.unwrap().unwrap();
    let pr = out.record;
    assert!(out.warnings.is_empty());
    assert_eq!((pr.additions, pr.deletions, pr.files_changed), (15, 3, 2));
    assert_eq!(pr.commit_count, 2);
    assert_eq!(pr.commit_shas, vec!["c1".to_string(), "c2".to_string()]);
    assert_eq!(pr.review_count, 1);
    assert_eq!(pr.reviewers, vec!["alice".to_string()]);
    assert_eq!(pr.comment_count, 1);
    assert_eq!(pr.ci_outcome, CiOutcome::Pending);
    assert_eq!(pr.linked_issue, Some(42));
    assert_eq!(pr.merge_commit_sha.as_deref(), Some("m1"));
    assert!(pr.merged_at.is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn failed_sub_fetches_default_their_fields_only() {
    let api = Arc::new(FixtureApi::new());
    route_detail(&api, 6);
    api.respond(&page("/pulls/6/files"), ApiResponse::status(500, "boom"));
    api.route(&page("/pulls/6/commits"), json!([{ "sha": "c1" }]));
    api.route(&page("/pulls/6/reviews"), json!([]));
    api.route(&page("/issues/6/comments"), json!([]));
    // check runs route missing: 404

    let out = enrich_pull(&client(api), summary(6)).await.unwrap().unwrap();
    let pr = out.record;
    assert_eq!((pr.additions, pr.deletions, pr.files_changed), (999, 999, 9));
    assert_eq!(pr.ci_outcome, CiOutcome::Unknown);
    assert_eq!(pr.commit_count, 1);

    let fields: Vec<&str> = out.warnings.iter().map(|w| w.field.as_str()).collect();
    assert_eq!(fields, vec!["files", "check_runs"]);
  }

  #[tokio::test]
  async fn missing_detail_skips_the_pull_request() {
    let api = Arc::new(FixtureApi::new());
    let out = enrich_pull(&client(api), summary(404)).await.unwrap();
    assert!(out.is_none());
  }

  #[tokio::test]
  async fn fatal_detail_fetch_aborts() {
    let api = Arc::new(FixtureApi::new());
    api.respond(
      "/repos/octo/widgets/pulls/8",
      ApiResponse::status(401, r#"{"message":"Bad credentials"}"#),
    );
    let err = enrich_pull(&client(api), summary(8)).await.unwrap_err();
    assert!(matches!(err, AnalyzeError::Fatal { .. }));
  }
}
