// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Error taxonomy shared by the scheduler, fetchers and aggregation (InvalidInput, NotFound, RateLimited, Transient, Fatal)
// role: errors/taxonomy
// outputs: AnalyzeError enum, RateLimitKind, PartialEnrichment warning record
// invariants:
// - Every remote error carries a context string naming owner/repo and endpoint or item
// - PartialEnrichment is never an error; it is logged and attached to the report
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = AnalyzeError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
  /// Budget exhausted (HTTP 429, or 403 with no remaining quota).
  Primary,
  /// Abuse detection / secondary limit, signalled through the error message.
  Secondary,
}

impl std::fmt::Display for RateLimitKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RateLimitKind::Primary => f.write_str("primary"),
      RateLimitKind::Secondary => f.write_str("secondary"),
    }
  }
}

#[derive(Debug, Clone, Error)]
pub enum AnalyzeError {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("not found: {context}")]
  NotFound { context: String },

  #[error("{kind} rate limit hit on {context}")]
  RateLimited {
    kind: RateLimitKind,
    retry_after: Option<Duration>,
    context: String,
  },

  #[error("transient failure on {context}: {message}")]
  Transient { context: String, message: String },

  #[error("fatal error on {context}: {message}")]
  Fatal { context: String, message: String },

  /// The run was cancelled before this unit of work could be dispatched.
  #[error("cancelled")]
  Cancelled,
}

impl AnalyzeError {
  pub fn fatal(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
    AnalyzeError::Fatal {
      context: context.into(),
      message: message.to_string(),
    }
  }

  pub fn transient(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
    AnalyzeError::Transient {
      context: context.into(),
      message: message.to_string(),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, AnalyzeError::Cancelled)
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, AnalyzeError::NotFound { .. })
  }
}

/// A sub-resource of one item could not be fetched; the item was still produced
/// with the named field defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEnrichment {
  pub item: String,
  pub field: String,
  pub error: String,
}

impl PartialEnrichment {
  pub fn new(item: impl Into<String>, field: &str, err: &AnalyzeError) -> Self {
    Self::record(item.into(), field, err.to_string())
  }

  /// A listing that stopped at the page ceiling; its field holds only the pages walked.
  pub fn truncated(item: impl Into<String>, field: &str, pages: u32) -> Self {
    Self::record(item.into(), field, format!("listing truncated at the {}-page ceiling", pages))
  }

  fn record(item: String, field: &str, error: String) -> Self {
    let warning = PartialEnrichment {
      item,
      field: field.to_string(),
      error,
    };

    tracing::warn!(item = %warning.item, field = %warning.field, error = %warning.error, "partial enrichment");

    warning
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_includes_context() {
    let e = AnalyzeError::fatal("octo/repo pulls/7", "unexpected shape");
    assert_eq!(e.to_string(), "fatal error on octo/repo pulls/7: unexpected shape");

    let rl = AnalyzeError::RateLimited {
      kind: RateLimitKind::Secondary,
      retry_after: None,
      context: "octo/repo".into(),
    };
    assert_eq!(rl.to_string(), "secondary rate limit hit on octo/repo");
  }

  #[test]
  fn partial_enrichment_records_field() {
    let err = AnalyzeError::transient("octo/repo pulls/3/files", "timeout");
    let w = PartialEnrichment::new("pull #3", "files", &err);
    assert_eq!(w.field, "files");
    assert!(w.error.contains("timeout"));
  }
}
