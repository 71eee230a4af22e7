// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Walk paged GitHub listings: newest-first with a time boundary short-circuit, or plain until the last page
// role: pagination/collection
// inputs: GithubClient, base ApiRequest, ReportWindow, per-item async handler
// outputs: Collected<R> (items in arrival order plus a cancelled flag)
// invariants:
// - The first item older than `since` ends the walk; nothing after it is examined
// - Items newer than `until` are skipped without ending the walk
// - Each in-range item is fully handled before the next one is looked at
// - Cancellation yields the partial collection, never an error
// errors: Propagates non-cancellation errors from page fetches and the handler
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{AnalyzeError, PartialEnrichment, Result};
use crate::github::api::ApiRequest;
use crate::github::client::GithubClient;
use crate::model::ReportWindow;

pub const PAGE_SIZE: usize = 100;

pub trait CreatedAt {
  fn created_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collected<R> {
  pub items: Vec<R>,
  pub cancelled: bool,
  /// The walk stopped at the page ceiling with more pages left.
  pub truncated: bool,
  pub pages: u32,
}

impl<R> Default for Collected<R> {
  fn default() -> Self {
    Collected {
      items: Vec::new(),
      cancelled: false,
      truncated: false,
      pages: 0,
    }
  }
}

impl<R> Collected<R> {
  /// The items, or `Cancelled` if the walk was cut short.
  pub fn complete(self) -> Result<Vec<R>> {
    if self.cancelled {
      Err(AnalyzeError::Cancelled)
    } else {
      Ok(self.items)
    }
  }

  /// A report warning for `item`'s `field` when the walk hit the page ceiling.
  pub fn truncation(&self, item: &str, field: &str) -> Option<PartialEnrichment> {
    self
      .truncated
      .then(|| PartialEnrichment::truncated(item, field, self.pages))
  }
}

fn page_request(base: &ApiRequest, page: u32) -> ApiRequest {
  base.clone().query("per_page", PAGE_SIZE).query("page", page)
}

/// Walk a listing sorted by creation time, newest first, handing each in-range
/// item to `on_item`. `on_item` returns `Ok(None)` to drop an item.
pub async fn fetch_since<T, R, F, Fut>(
  client: &GithubClient,
  base: ApiRequest,
  window: &ReportWindow,
  mut on_item: F,
) -> Result<Collected<R>>
where
  T: DeserializeOwned + CreatedAt,
  F: FnMut(T) -> Fut,
  Fut: Future<Output = Result<Option<R>>>,
{
  let mut out = Collected::default();
  let mut page = 1u32;

  loop {
    if client.is_cancelled() {
      out.cancelled = true;
      return Ok(out);
    }

    let batch: Vec<T> = match client.get_json(page_request(&base, page)).await {
      Ok(b) => b,
      Err(AnalyzeError::Cancelled) => {
        out.cancelled = true;
        return Ok(out);
      }
      Err(e) => return Err(e),
    };
    out.pages += 1;
    let len = batch.len();

    for item in batch {
      let created = item.created_at();

      if created < window.since {
        debug!(path = %base.path, page, created = %created, "crossed window start; stopping");
        return Ok(out);
      }
      if created > window.until {
        continue;
      }

      match on_item(item).await {
        Ok(Some(r)) => out.items.push(r),
        Ok(None) => {}
        Err(AnalyzeError::Cancelled) => {
          out.cancelled = true;
          return Ok(out);
        }
        Err(e) => return Err(e),
      }

      if client.is_cancelled() {
        out.cancelled = true;
        return Ok(out);
      }
    }

    if len < PAGE_SIZE {
      return Ok(out);
    }
    page += 1;
  }
}

/// Walk every page of a listing until a short page, bounded by the client's
/// page ceiling.
pub async fn fetch_all<T>(client: &GithubClient, base: ApiRequest) -> Result<Collected<T>>
where
  T: DeserializeOwned,
{
  let mut out = Collected::default();
  let ceiling = client.page_ceiling();

  for page in 1..=ceiling {
    let batch: Vec<T> = match client.get_json(page_request(&base, page)).await {
      Ok(b) => b,
      Err(AnalyzeError::Cancelled) => {
        out.cancelled = true;
        return Ok(out);
      }
      Err(e) => return Err(e),
    };
    out.pages += 1;
    let len = batch.len();
    out.items.extend(batch);

    if len < PAGE_SIZE {
      return Ok(out);
    }
  }

  warn!(path = %base.path, pages = ceiling, "page ceiling reached; listing truncated");
  out.truncated = true;
  Ok(out)
}
