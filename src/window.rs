// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Parse and validate the analysis window (since/until or calendar month); resolve an open end to "now" once
// role: window/resolution
// inputs: CLI strings (RFC 3339, YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS, YYYY-MM); an explicit "now"
// outputs: Window (until optional) and ReportWindow (both ends fixed)
// invariants:
// - since <= until; neither end lies after "now"
// - An open until becomes the single "now" instant used by every fetch in the run
// errors: InvalidInput with the offending value
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, Result};
use crate::model::ReportWindow;

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum WindowSpec {
  Month { ym: String },
  SinceUntil { since: String, until: Option<String> },
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Window {
  pub since: DateTime<Utc>,
  pub until: Option<DateTime<Utc>>,
}

impl Window {
  /// Fix the open end at `now` and check ordering.
  pub fn resolve(&self, now: DateTime<Utc>) -> Result<ReportWindow> {
    let until = self.until.unwrap_or(now);

    if self.since > now {
      return Err(AnalyzeError::InvalidInput(format!(
        "window start {} is in the future",
        self.since.to_rfc3339()
      )));
    }
    if until > now {
      return Err(AnalyzeError::InvalidInput(format!(
        "window end {} is in the future",
        until.to_rfc3339()
      )));
    }
    if self.since > until {
      return Err(AnalyzeError::InvalidInput(format!(
        "window start {} is after its end {}",
        self.since.to_rfc3339(),
        until.to_rfc3339()
      )));
    }

    Ok(ReportWindow {
      since: self.since,
      until,
    })
  }
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (UTC) or a bare date (midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
  let s = raw.trim();

  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
    return Ok(Utc.from_utc_datetime(&ndt));
  }
  if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    if let Some(ndt) = d.and_hms_opt(0, 0, 0) {
      return Ok(Utc.from_utc_datetime(&ndt));
    }
  }

  Err(AnalyzeError::InvalidInput(format!("unrecognized timestamp: {:?}", raw)))
}

/// First and last second of a calendar month. A month that has not ended yet
/// yields an open end.
pub fn month_bounds(year_month: &str, now: DateTime<Utc>) -> Result<Window> {
  let invalid = || AnalyzeError::InvalidInput(format!("invalid --month {:?}, expected YYYY-MM", year_month));

  let (y, m) = year_month.trim().split_once('-').ok_or_else(invalid)?;
  let y: i32 = y.parse().map_err(|_| invalid())?;
  let m: u32 = m.parse().map_err(|_| invalid())?;

  if !(1..=12).contains(&m) {
    return Err(invalid());
  }
  let next_y = if m == 12 { y + 1 } else { y };
  let next_m = if m == 12 { 1 } else { m + 1 };

  let start = Utc.with_ymd_and_hms(y, m, 1, 0, 0, 0).single().ok_or_else(invalid)?;
  let next = Utc
    .with_ymd_and_hms(next_y, next_m, 1, 0, 0, 0)
    .single()
    .ok_or_else(invalid)?;
  let end = next - chrono::Duration::seconds(1);

  Ok(Window {
    since: start,
    until: if end > now { None } else { Some(end) },
  })
}

pub fn window_from_spec(spec: &WindowSpec, now: DateTime<Utc>) -> Result<Window> {
  match spec {
    WindowSpec::Month { ym } => month_bounds(ym, now),
    WindowSpec::SinceUntil { since, until } => Ok(Window {
      since: parse_instant(since)?,
      until: until.as_deref().map(parse_instant).transpose()?,
    }),
  }
}
