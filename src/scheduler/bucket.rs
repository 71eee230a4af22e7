use tokio::time::{Duration, Instant};

use crate::error::{AnalyzeError, Result};

/// Outbound request budget. Only the scheduler reads or mutates the live state
/// derived from it; callers hand it over at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBudget {
  pub capacity: u32,
  pub refill_amount: u32,
  pub refill_interval: Duration,
  pub min_spacing: Duration,
  pub max_concurrent: usize,
}

impl RequestBudget {
  /// Defaults sized for the GitHub REST quota: 5000/h with a token, 60/h without.
  pub fn for_credential(authenticated: bool) -> Self {
    if authenticated {
      RequestBudget {
        capacity: 80,
        refill_amount: 80,
        refill_interval: Duration::from_secs(60),
        min_spacing: Duration::from_millis(100),
        max_concurrent: 1,
      }
    } else {
      RequestBudget {
        capacity: 60,
        refill_amount: 60,
        refill_interval: Duration::from_secs(3600),
        min_spacing: Duration::from_secs(1),
        max_concurrent: 1,
      }
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.capacity == 0 || self.refill_amount == 0 {
      return Err(AnalyzeError::InvalidInput(
        "request budget needs a non-zero capacity and refill amount".into(),
      ));
    }
    if self.refill_interval.is_zero() {
      return Err(AnalyzeError::InvalidInput("request budget refill interval must be non-zero".into()));
    }
    if self.max_concurrent == 0 {
      return Err(AnalyzeError::InvalidInput("max_concurrent must be at least 1".into()));
    }
    Ok(())
  }
}

/// Token bucket plus dispatch spacing. Time is passed in so the arithmetic stays
/// deterministic under test.
#[derive(Debug)]
pub(crate) struct TokenBucket {
  capacity: u32,
  refill_amount: u32,
  refill_interval: Duration,
  min_spacing: Duration,
  remaining: u32,
  last_refill: Instant,
  last_dispatch: Option<Instant>,
}

impl TokenBucket {
  pub(crate) fn new(budget: &RequestBudget, now: Instant) -> Self {
    TokenBucket {
      capacity: budget.capacity,
      refill_amount: budget.refill_amount,
      refill_interval: budget.refill_interval,
      min_spacing: budget.min_spacing,
      remaining: budget.capacity,
      last_refill: now,
      last_dispatch: None,
    }
  }

  pub(crate) fn remaining(&self) -> u32 {
    self.remaining
  }

  fn refill(&mut self, now: Instant) {
    let elapsed = now.saturating_duration_since(self.last_refill);
    let periods = elapsed.as_nanos() / self.refill_interval.as_nanos();

    if periods == 0 {
      return;
    }

    let added = periods.saturating_mul(u128::from(self.refill_amount));

    if added >= u128::from(self.capacity) {
      self.remaining = self.capacity;
      let rem = elapsed.as_nanos() % self.refill_interval.as_nanos();
      self.last_refill = now - Duration::from_nanos(rem as u64);
    } else {
      // added < capacity, so periods fits in u32
      self.remaining = self.remaining.saturating_add(added as u32).min(self.capacity);
      self.last_refill += self.refill_interval * periods as u32;
    }
  }

  /// Consume one token if a dispatch may happen at `now`; otherwise report how
  /// long to wait before asking again.
  pub(crate) fn try_acquire(&mut self, now: Instant) -> std::result::Result<(), Duration> {
    self.refill(now);

    if let Some(last) = self.last_dispatch {
      let ready = last + self.min_spacing;
      if now < ready {
        return Err(ready - now);
      }
    }

    if self.remaining == 0 {
      let next_refill = self.last_refill + self.refill_interval;
      return Err(next_refill.saturating_duration_since(now).max(Duration::from_millis(1)));
    }

    self.remaining -= 1;
    self.last_dispatch = Some(now);
    Ok(())
  }
}
