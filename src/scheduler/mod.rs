// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Rate-limited request scheduler: token bucket, dispatch spacing, concurrency cap, retry with backoff
// role: scheduler/outbound
// inputs: RequestBudget, RetryPolicy, CancellationToken; units of work as async closures
// outputs: Result of each unit of work after retries
// side_effects: Sleeps on tokio time; logs every retry and rate-limit wait
// invariants:
// - Bucket state is owned here and only touched under the admission lock
// - Admission is FIFO; retry waits happen outside the lock and never block other callers
// - A unit that exhausts retries fails alone; the scheduler stays usable
// - After cancellation nothing new is dispatched; in-flight calls run to completion or timeout
// errors: Returns the last error of a unit after its retry budget is spent; Cancelled when shut down
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

mod bucket;
pub mod policy;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AnalyzeError, Result};
use bucket::TokenBucket;
use policy::{decide, Attempts, RetryDecision, RetryPolicy};

pub use bucket::RequestBudget;

/// Ceiling for a single dispatched call; exceeding it counts as a transient failure.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

struct Inner {
  budget: RequestBudget,
  policy: RetryPolicy,
  call_timeout: Duration,
  bucket: Mutex<TokenBucket>,
  permits: Arc<Semaphore>,
  cancel: CancellationToken,
  dispatched: AtomicU64,
}

/// Cheap to clone; all clones share one budget.
#[derive(Clone)]
pub struct Scheduler {
  inner: Arc<Inner>,
}

impl Scheduler {
  pub fn new(budget: RequestBudget, policy: RetryPolicy, cancel: CancellationToken) -> Result<Self> {
    Self::with_call_timeout(budget, policy, CALL_TIMEOUT, cancel)
  }

  pub fn with_call_timeout(
    budget: RequestBudget,
    policy: RetryPolicy,
    call_timeout: Duration,
    cancel: CancellationToken,
  ) -> Result<Self> {
    budget.validate()?;

    let bucket = TokenBucket::new(&budget, Instant::now());
    let permits = Arc::new(Semaphore::new(budget.max_concurrent));

    Ok(Scheduler {
      inner: Arc::new(Inner {
        budget,
        policy,
        call_timeout,
        bucket: Mutex::new(bucket),
        permits,
        cancel,
        dispatched: AtomicU64::new(0),
      }),
    })
  }

  pub fn is_cancelled(&self) -> bool {
    self.inner.cancel.is_cancelled()
  }

  /// Number of dispatches so far, retries included.
  pub fn dispatched(&self) -> u64 {
    self.inner.dispatched.load(Ordering::Relaxed)
  }

  pub async fn remaining(&self) -> u32 {
    self.inner.bucket.lock().await.remaining()
  }

  /// Run `work` under the budget, retrying per policy. `work` is invoked once per
  /// attempt; `label` names the call in logs and timeout errors.
  pub async fn submit<T, F, Fut>(&self, label: &str, mut work: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let mut attempts = Attempts::default();

    loop {
      let permit = self.admit(label).await?;

      let outcome = match timeout(self.inner.call_timeout, work()).await {
        Ok(result) => result,
        Err(_) => Err(AnalyzeError::transient(
          label,
          format!("timed out after {}s", self.inner.call_timeout.as_secs()),
        )),
      };
      drop(permit);

      let err = match outcome {
        Ok(value) => return Ok(value),
        Err(e) => e,
      };

      attempts.record(&err);

      match decide(&err, attempts, &self.inner.policy) {
        RetryDecision::GiveUp => return Err(err),
        RetryDecision::Retry { wait } => {
          if matches!(err, AnalyzeError::RateLimited { .. }) {
            warn!(call = label, wait_ms = wait.as_millis() as u64, error = %err, "rate limited, waiting before retry");
          } else {
            warn!(call = label, attempt = attempts.transient, wait_ms = wait.as_millis() as u64, error = %err, "retrying after transient failure");
          }

          tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(AnalyzeError::Cancelled),
            _ = sleep(wait) => {}
          }
        }
      }
    }
  }

  /// Wait for a concurrency slot, a token and the spacing gap, in arrival order.
  async fn admit(&self, label: &str) -> Result<OwnedSemaphorePermit> {
    let cancel = &self.inner.cancel;

    if cancel.is_cancelled() {
      return Err(AnalyzeError::Cancelled);
    }

    let mut bucket = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(AnalyzeError::Cancelled),
      guard = self.inner.bucket.lock() => guard,
    };

    let permit = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(AnalyzeError::Cancelled),
      p = self.inner.permits.clone().acquire_owned() => p.map_err(|_| AnalyzeError::Cancelled)?,
    };

    loop {
      match bucket.try_acquire(Instant::now()) {
        Ok(()) => break,
        Err(wait) => {
          debug!(call = label, wait_ms = wait.as_millis() as u64, "waiting for request budget");
          tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalyzeError::Cancelled),
            _ = sleep(wait) => {}
          }
        }
      }
    }

    let n = self.inner.dispatched.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(call = label, dispatch = n, remaining = bucket.remaining(), "dispatch");

    Ok(permit)
  }

  /// Wait until no call is in flight. Used once a run is over (or cancelled)
  /// before its resources are released.
  pub async fn drain(&self) {
    let slots = self.inner.budget.max_concurrent as u32;
    let _all = self.inner.permits.acquire_many(slots).await;
    debug!(dispatched = self.dispatched(), "scheduler drained");
  }
}
