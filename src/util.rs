// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Small helpers for time formatting, durations, medians and login normalization
// role: utilities/helpers
// outputs: RFC 3339 strings for API queries, non-negative second deltas, medians, normalized logins
// invariants:
// - iso() always renders UTC with a trailing Z and second precision
// - diff_seconds never returns a negative delta
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, SecondsFormat, Utc};

/// Sentinel login for activity with no resolvable identity.
pub const UNKNOWN_LOGIN: &str = "unknown";

/// Formats an instant the way the GitHub API accepts it in `since`/`until` queries.
pub fn iso(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Seconds from `start` to `end`, or None when `end` precedes `start`.
pub fn diff_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<u64> {
  let secs = (end - start).num_seconds();
  u64::try_from(secs).ok()
}

pub fn median(values: &mut [f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  values.sort_by(|a, b| a.total_cmp(b));
  let mid = values.len() / 2;

  if values.len() % 2 == 0 {
    Some((values[mid - 1] + values[mid]) / 2.0)
  } else {
    Some(values[mid])
  }
}

pub fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}

/// First non-blank candidate, else the `unknown` sentinel. The value is kept
/// verbatim, whitespace included; logins are exact-match keys.
pub fn login_or_unknown<'a, I>(candidates: I) -> String
where
  I: IntoIterator<Item = Option<&'a str>>,
{
  candidates
    .into_iter()
    .flatten()
    .find(|s| !s.trim().is_empty())
    .unwrap_or(UNKNOWN_LOGIN)
    .to_string()
}

pub fn is_bot_login(login: &str) -> bool {
  login.ends_with("[bot]")
}
