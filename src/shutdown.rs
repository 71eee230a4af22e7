// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Own the run's cancellation token; wire Ctrl-C to it and wait for in-flight calls on the way out
// role: shutdown/coordination
// inputs: CancellationToken; OS interrupt signal
// outputs: Cancellation observed by the scheduler, pagination and enrichment
// invariants: Triggering is idempotent; finish() returns only once no call is in flight
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::scheduler::Scheduler;

#[derive(Clone, Debug, Default)]
pub struct Shutdown {
  token: CancellationToken,
}

impl Shutdown {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn token(&self) -> CancellationToken {
    self.token.clone()
  }

  pub fn trigger(&self) {
    self.token.cancel();
  }

  pub fn is_triggered(&self) -> bool {
    self.token.is_cancelled()
  }

  /// Cancel on the first Ctrl-C. The listener ends with the run.
  pub fn listen_for_ctrl_c(&self) {
    let token = self.token.clone();

    tokio::spawn(async move {
      tokio::select! {
        res = tokio::signal::ctrl_c() => {
          if res.is_ok() {
            warn!("interrupt received; finishing in-flight requests and emitting a partial report");
            token.cancel();
          }
        }
        _ = token.cancelled() => {}
      }
    });
  }

  /// Wait until the scheduler has nothing in flight.
  pub async fn finish(&self, scheduler: &Scheduler) {
    scheduler.drain().await;
  }
}
