// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Repository-scoped GitHub client; every call goes through the scheduler and is classified into the error taxonomy
// role: github/client
// inputs: Arc<dyn GithubApi>, Scheduler, owner/repo
// outputs: Typed responses decoded from JSON bodies
// invariants:
// - No call bypasses the scheduler
// - Status classification is the only place HTTP codes turn into AnalyzeError kinds
// errors: NotFound, RateLimited, Transient, Fatal with "owner/repo endpoint" context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::api::{ApiRequest, ApiResponse, GithubApi};
use crate::error::{AnalyzeError, RateLimitKind, Result};
use crate::ext::serde_json::{decode_shape, error_message};
use crate::scheduler::Scheduler;

/// Upper bound on pages walked by an unbounded listing.
pub const DEFAULT_PAGE_CEILING: u32 = 30;

#[derive(Clone)]
pub struct GithubClient {
  api: Arc<dyn GithubApi>,
  scheduler: Scheduler,
  owner: String,
  repo: String,
  page_ceiling: u32,
}

impl GithubClient {
  pub fn new(api: Arc<dyn GithubApi>, scheduler: Scheduler, owner: &str, repo: &str) -> Self {
    GithubClient {
      api,
      scheduler,
      owner: owner.to_string(),
      repo: repo.to_string(),
      page_ceiling: DEFAULT_PAGE_CEILING,
    }
  }

  pub fn with_page_ceiling(mut self, pages: u32) -> Self {
    self.page_ceiling = pages.max(1);
    self
  }

  pub fn page_ceiling(&self) -> u32 {
    self.page_ceiling
  }

  pub fn slug(&self) -> String {
    format!("{}/{}", self.owner, self.repo)
  }

  /// `/repos/{owner}/{repo}{suffix}`
  pub fn repo_path(&self, suffix: &str) -> String {
    format!("/repos/{}/{}{}", self.owner, self.repo, suffix)
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn is_cancelled(&self) -> bool {
    self.scheduler.is_cancelled()
  }

  pub async fn get_json<T>(&self, request: ApiRequest) -> Result<T>
  where
    T: DeserializeOwned,
  {
    let context = format!("{} {}", self.slug(), request.key());
    let response = self.get(&context, &request).await?;
    decode_shape(&context, &response.body)
  }

  async fn get(&self, context: &str, request: &ApiRequest) -> Result<ApiResponse> {
    let api = &self.api;

    self
      .scheduler
      .submit(context, move || async move {
        let response = api
          .get(request)
          .await
          .map_err(|e| AnalyzeError::transient(context, e))?;
        classify(context, response)
      })
      .await
  }
}

fn mentions_secondary_limit(message: &str) -> bool {
  let lower = message.to_lowercase();
  lower.contains("secondary rate limit") || lower.contains("abuse detection")
}

/// Map an HTTP response onto the error taxonomy; 2xx passes through.
pub fn classify(context: &str, response: ApiResponse) -> Result<ApiResponse> {
  let status = response.status;

  if (200..300).contains(&status) {
    return Ok(response);
  }

  let message = error_message(&response.body).unwrap_or_default();

  if (status == 403 || status == 429) && mentions_secondary_limit(&message) {
    return Err(AnalyzeError::RateLimited {
      kind: RateLimitKind::Secondary,
      retry_after: response.retry_after,
      context: context.to_string(),
    });
  }

  match status {
    404 | 410 => Err(AnalyzeError::NotFound {
      context: context.to_string(),
    }),
    429 => Err(AnalyzeError::RateLimited {
      kind: RateLimitKind::Primary,
      retry_after: response.retry_after,
      context: context.to_string(),
    }),
    403 if response.rate_limit_remaining == Some(0) => Err(AnalyzeError::RateLimited {
      kind: RateLimitKind::Primary,
      retry_after: response.retry_after,
      context: context.to_string(),
    }),
    401 | 403 => Err(AnalyzeError::fatal(
      context,
      format!("access denied ({}): {}", status, message),
    )),
    500..=599 => Err(AnalyzeError::transient(context, format!("server error {}", status))),
    _ => Err(AnalyzeError::fatal(
      context,
      format!("unexpected status {}: {}", status, message),
    )),
  }
}
