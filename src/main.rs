use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod analyze;
mod branches;
mod cli;
mod contributors;
mod enrichment;
mod error;
mod ext;
mod github;
mod model;
mod pagination;
mod scheduler;
mod shutdown;
mod util;
mod window;

use crate::analyze::{analyze, AnalyzeRequest};
use crate::cli::{normalize, Cli};
use crate::github::api::{discover_token, FixtureApi, GithubApi, HttpApi, FIXTURES_ENV};
use crate::scheduler::policy::RetryPolicy;
use crate::scheduler::CALL_TIMEOUT;
use crate::shutdown::Shutdown;

/// Logs go to stderr; stdout carries the report.
fn init_tracing(verbose: bool) {
  let fallback = if verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: resolve now and the window
  let now = match cfg.now_override.as_deref() {
    Some(s) => window::parse_instant(s).context("--now-override")?,
    None => Utc::now(),
  };
  let window = window::window_from_spec(&cfg.window, now)?;

  // Phase 3: pick the transport
  let (api, authenticated): (Arc<dyn GithubApi>, bool) = match std::env::var_os(FIXTURES_ENV) {
    Some(path) => {
      let fixtures = FixtureApi::load(Path::new(&path))?;
      tracing::info!(path = %Path::new(&path).display(), "serving requests from fixtures");
      (Arc::new(fixtures) as Arc<dyn GithubApi>, true)
    }
    None => {
      let token = discover_token(cfg.token.clone());
      let authenticated = token.is_some();
      if !authenticated {
        tracing::warn!("no GitHub token found; using the anonymous request budget");
      }
      let http = HttpApi::new(&cfg.api_url, token, CALL_TIMEOUT);
      (Arc::new(http) as Arc<dyn GithubApi>, authenticated)
    }
  };

  // Phase 4: run
  let shutdown = Shutdown::new();
  shutdown.listen_for_ctrl_c();

  let request = AnalyzeRequest {
    owner: cfg.owner.clone(),
    repo: cfg.repo.clone(),
    window,
    now,
  };
  let report = analyze(
    api,
    cfg.budget(authenticated),
    RetryPolicy::default(),
    &request,
    &cfg.options(),
    &shutdown,
  )
  .await
  .with_context(|| format!("analyzing {}/{}", cfg.owner, cfg.repo))?;
  shutdown.trigger();

  // Phase 5: emit
  let json = serde_json::to_string_pretty(&report)?;
  if cfg.out == "-" {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
  } else {
    std::fs::write(&cfg.out, format!("{}\n", json)).with_context(|| format!("writing {}", cfg.out))?;
  }

  Ok(())
}
