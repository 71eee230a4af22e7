// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate one analysis run: validate, list and enrich PRs and issues, collect commits, fold the report
// role: analyze/orchestration
// inputs: Arc<dyn GithubApi>, RequestBudget, RetryPolicy, AnalyzeRequest, AnalyzeOptions, Shutdown
// outputs: AnalysisReport
// side_effects: All remote calls go through one Scheduler owned by the run
// invariants:
// - Slug and window are validated before the first remote call
// - The window's open end is fixed once and shared by every phase
// - Cancellation yields a report with partial = true; drain completes before returning
// errors: InvalidInput before any call; NotFound for a missing repository; primary fetch failures abort
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::branches::{count_commits_by_author, CommitTally};
use crate::contributors;
use crate::enrichment::commits::{associate_pull_requests, default_branch_history};
use crate::enrichment::issues::{enrich_issue, link_pull_requests};
use crate::enrichment::pull_requests::enrich_pull;
use crate::enrichment::Enriched;
use crate::error::{AnalyzeError, PartialEnrichment, Result};
use crate::github::api::{ApiRequest, GithubApi};
use crate::github::client::{GithubClient, DEFAULT_PAGE_CEILING};
use crate::github::wire::{WireIssue, WirePullSummary, WireRepository};
use crate::model::{AnalysisReport, CommitRecord, IssueRecord, PullRequestRecord, ReportWindow};
use crate::pagination::fetch_since;
use crate::scheduler::policy::RetryPolicy;
use crate::scheduler::{RequestBudget, Scheduler};
use crate::shutdown::Shutdown;
use crate::window::Window;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
  /// Also tally commits across every branch.
  pub all_branches: bool,
  /// Fetch stats and check runs for each default-branch commit.
  pub commit_details: bool,
  pub page_ceiling: u32,
}

impl Default for AnalyzeOptions {
  fn default() -> Self {
    AnalyzeOptions {
      all_branches: false,
      commit_details: false,
      page_ceiling: DEFAULT_PAGE_CEILING,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
  pub owner: String,
  pub repo: String,
  pub window: Window,
  /// The instant an open window end resolves to.
  pub now: DateTime<Utc>,
}

fn valid_slug_part(s: &str) -> bool {
  !s.is_empty() && s != "." && s != ".." && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub fn validate_slug(owner: &str, repo: &str) -> Result<()> {
  if valid_slug_part(owner) && valid_slug_part(repo) {
    Ok(())
  } else {
    Err(AnalyzeError::InvalidInput(format!(
      "invalid repository {:?}, expected owner/repo",
      format!("{}/{}", owner, repo)
    )))
  }
}

/// Split `owner/repo` into its parts.
pub fn parse_slug(slug: &str) -> Result<(String, String)> {
  let (owner, repo) = slug
    .trim()
    .split_once('/')
    .ok_or_else(|| AnalyzeError::InvalidInput(format!("invalid repository {:?}, expected owner/repo", slug)))?;
  let repo = repo.trim_end_matches(".git");
  validate_slug(owner, repo)?;
  Ok((owner.to_string(), repo.to_string()))
}

#[derive(Debug, Default)]
struct Gathered {
  pull_requests: Vec<PullRequestRecord>,
  issues: Vec<IssueRecord>,
  commits: Vec<CommitRecord>,
  tally: Option<CommitTally>,
  warnings: Vec<PartialEnrichment>,
  cancelled: bool,
}

fn split<T>(items: Vec<Enriched<T>>, warnings: &mut Vec<PartialEnrichment>) -> Vec<T> {
  items
    .into_iter()
    .map(|e| {
      warnings.extend(e.warnings);
      e.record
    })
    .collect()
}

/// Newest-first listing request shared by the PR and issue walks.
fn created_desc(client: &GithubClient, suffix: &str) -> ApiRequest {
  ApiRequest::new(client.repo_path(suffix))
    .query("state", "all")
    .query("sort", "created")
    .query("direction", "desc")
}

async fn gather(client: &GithubClient, window: &ReportWindow, options: &AnalyzeOptions) -> Result<Gathered> {
  let mut out = Gathered::default();

  // Phase 1: repository metadata
  let repo: WireRepository = match client.get_json(ApiRequest::new(client.repo_path(""))).await {
    Ok(r) => r,
    Err(AnalyzeError::Cancelled) => {
      out.cancelled = true;
      return Ok(out);
    }
    Err(e) => return Err(e),
  };
  info!(repo = %client.slug(), default_branch = %repo.default_branch, "repository resolved");

  // Phase 2: pull requests, enriched one at a time as the listing is walked
  let prs = fetch_since(client, created_desc(client, "/pulls"), window, |s: WirePullSummary| {
    enrich_pull(client, s)
  })
  .await?;
  out.cancelled |= prs.cancelled;
  out.pull_requests = split(prs.items, &mut out.warnings);
  info!(count = out.pull_requests.len(), pages = prs.pages, "pull requests collected");

  // Phase 3: issues
  let issues = fetch_since(client, created_desc(client, "/issues"), window, |i: WireIssue| {
    enrich_issue(client, i)
  })
  .await?;
  out.cancelled |= issues.cancelled;
  out.issues = split(issues.items, &mut out.warnings);
  info!(count = out.issues.len(), pages = issues.pages, "issues collected");

  // Phase 4: default-branch commits
  let mut history = default_branch_history(client, window, &repo.default_branch, options.commit_details).await?;
  associate_pull_requests(client, &mut history, &contributors::pull_request_shas(&out.pull_requests)).await;
  out.cancelled |= history.cancelled;
  out.commits = history.records;
  out.warnings.extend(history.warnings);

  // Phase 5: optional cross-branch tally
  if options.all_branches {
    let mut tally = count_commits_by_author(client, window).await?;
    out.cancelled |= tally.cancelled;
    out.warnings.append(&mut tally.warnings);
    out.tally = Some(tally);
  }

  Ok(out)
}

/// Run one analysis. The scheduler is created here and drained before returning,
/// whether the run succeeded, failed or was cancelled.
pub async fn analyze(
  api: Arc<dyn GithubApi>,
  budget: RequestBudget,
  policy: RetryPolicy,
  request: &AnalyzeRequest,
  options: &AnalyzeOptions,
  shutdown: &Shutdown,
) -> Result<AnalysisReport> {
  validate_slug(&request.owner, &request.repo)?;
  let window = request.window.resolve(request.now)?;

  let scheduler = Scheduler::new(budget, policy, shutdown.token())?;
  let client = GithubClient::new(api, scheduler.clone(), &request.owner, &request.repo)
    .with_page_ceiling(options.page_ceiling);

  info!(
    repo = %client.slug(),
    since = %window.since,
    until = %window.until,
    all_branches = options.all_branches,
    "analysis started"
  );

  let gathered = gather(&client, &window, options).await;
  shutdown.finish(&scheduler).await;
  let mut g = gathered?;

  let cancelled = g.cancelled || shutdown.is_triggered();
  if cancelled {
    warn!(repo = %client.slug(), "run cancelled; report is partial");
  }

  link_pull_requests(&mut g.issues, &g.pull_requests);
  let (contributors, summary) = contributors::build(&g.pull_requests, &g.commits, &g.issues, g.tally.as_ref());

  info!(
    dispatched = scheduler.dispatched(),
    prs = summary.prs_opened,
    issues = g.issues.len(),
    contributors = summary.contributors_active,
    warnings = g.warnings.len(),
    "analysis finished"
  );

  Ok(AnalysisReport {
    repository: client.slug(),
    window,
    summary,
    contributors,
    pull_requests: g.pull_requests,
    commits: g.commits,
    issues: g.issues,
    partial: cancelled,
    warnings: g.warnings,
  })
}
