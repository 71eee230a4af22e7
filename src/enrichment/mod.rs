// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for per-item enrichment (pull requests, issues, commits)
// role: enrichment/namespace
// outputs: Enriched<T> records plus the PartialEnrichment warnings raised while building them
// invariants: A failed sub-fetch defaults one field; it never fails the item
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod commits;
pub mod issues;
pub mod pull_requests;

use crate::error::{AnalyzeError, PartialEnrichment, Result};
use crate::pagination::Collected;

#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<T> {
  pub record: T,
  pub warnings: Vec<PartialEnrichment>,
}

/// Keep a sub-fetch result, or record why its field will be defaulted.
/// Cancellation defaults silently; the run is already marked partial.
pub(crate) fn settle<T>(item: &str, field: &str, res: Result<T>, warnings: &mut Vec<PartialEnrichment>) -> Option<T> {
  match res {
    Ok(v) => Some(v),
    Err(AnalyzeError::Cancelled) => None,
    Err(e) => {
      warnings.push(PartialEnrichment::new(item, field, &e));
      None
    }
  }
}

/// `settle` for a paged sub-listing. A listing cut at the page ceiling keeps the
/// items it has and adds a warning.
pub(crate) fn settle_listing<T>(
  item: &str,
  field: &str,
  res: Result<Collected<T>>,
  warnings: &mut Vec<PartialEnrichment>,
) -> Option<Vec<T>> {
  let listed = settle(item, field, res, warnings)?;
  warnings.extend(listed.truncation(item, field));
  listed.complete().ok()
}
