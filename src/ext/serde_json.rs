// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: JSON helpers for API bodies: typed decode for boundary structs and the error-body message
// role: extension/serde_json
// outputs: decode_shape, error_message
// invariants: No panics; a body without a message yields None; decode failures become Fatal with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{AnalyzeError, Result};

#[derive(Deserialize)]
struct ErrorBody {
  message: Option<String>,
}

/// Decode a response body into a boundary struct; any mismatch is an unexpected shape.
pub fn decode_shape<T>(context: &str, body: &str) -> Result<T>
where
  T: DeserializeOwned,
{
  serde_json::from_str::<T>(body).map_err(|e| AnalyzeError::fatal(context, format!("unexpected response shape: {}", e)))
}

/// The `message` of a GitHub error body, if the body is JSON and has one.
pub fn error_message(body: &str) -> Option<String> {
  serde_json::from_str::<ErrorBody>(body).ok()?.message
}
