// Retry policy as a pure function of (error, attempts so far).

use std::time::Duration;

use crate::error::{AnalyzeError, RateLimitKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts for transient failures, counting the first dispatch.
  pub max_attempts: u32,
  pub base_backoff: Duration,
  pub max_backoff: Duration,
  /// Wait used for a primary rate limit when the server sends no `retry-after`.
  pub rate_limit_fallback: Duration,
  pub secondary_cooldown: Duration,
  /// Rate-limit retries are budgeted separately from transient ones.
  pub max_rate_limit_retries: u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    RetryPolicy {
      max_attempts: 3,
      base_backoff: Duration::from_secs(1),
      max_backoff: Duration::from_secs(30),
      rate_limit_fallback: Duration::from_secs(60),
      secondary_cooldown: Duration::from_secs(60),
      max_rate_limit_retries: 5,
    }
  }
}

/// Failures observed so far for one unit of work, per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attempts {
  pub transient: u32,
  pub rate_limited: u32,
}

impl Attempts {
  pub fn record(&mut self, err: &AnalyzeError) {
    match err {
      AnalyzeError::Transient { .. } => self.transient += 1,
      AnalyzeError::RateLimited { .. } => self.rate_limited += 1,
      _ => {}
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
  Retry { wait: Duration },
  GiveUp,
}

/// Exponential backoff for the n-th transient failure (1-based), capped.
pub fn backoff(policy: &RetryPolicy, failures: u32) -> Duration {
  let exp = failures.saturating_sub(1).min(16);
  policy.base_backoff.saturating_mul(1u32 << exp).min(policy.max_backoff)
}

/// `attempts` must already include `err`.
pub fn decide(err: &AnalyzeError, attempts: Attempts, policy: &RetryPolicy) -> RetryDecision {
  match err {
    AnalyzeError::RateLimited { kind, retry_after, .. } => {
      if attempts.rate_limited > policy.max_rate_limit_retries {
        return RetryDecision::GiveUp;
      }
      let wait = match kind {
        RateLimitKind::Primary => retry_after.unwrap_or(policy.rate_limit_fallback),
        RateLimitKind::Secondary => policy.secondary_cooldown,
      };
      RetryDecision::Retry { wait }
    }
    AnalyzeError::Transient { .. } => {
      if attempts.transient >= policy.max_attempts {
        RetryDecision::GiveUp
      } else {
        RetryDecision::Retry {
          wait: backoff(policy, attempts.transient),
        }
      }
    }
    _ => RetryDecision::GiveUp,
  }
}
