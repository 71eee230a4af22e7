use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analyze::{parse_slug, AnalyzeOptions};
use crate::github::api::DEFAULT_API_URL;
use crate::github::client::DEFAULT_PAGE_CEILING;
use crate::scheduler::RequestBudget;
use crate::window::WindowSpec;

#[derive(Parser, Debug)]
#[command(
    name = "github-activity-report",
    version,
    about = "Summarize GitHub pull request, commit and issue activity for a time window as JSON",
    long_about = None
)]
pub struct Cli {
  /// Repository as owner/repo
  pub repository: String,

  /// Calendar month, e.g. 2025-08
  #[arg(long)]
  pub month: Option<String>,

  /// Window start (RFC 3339, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, UTC)
  #[arg(long, alias = "start")]
  pub since: Option<String>,

  /// Window end; defaults to now when omitted
  #[arg(long, alias = "end")]
  pub until: Option<String>,

  /// GitHub token; falls back to GH_TOKEN, then `gh auth token`
  #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
  pub token: Option<String>,

  /// GitHub REST API base URL (GitHub Enterprise: https://HOST/api/v3)
  #[arg(long, default_value = DEFAULT_API_URL)]
  pub api_url: String,

  /// Also count commits across every branch (each SHA once)
  #[arg(long)]
  pub all_branches: bool,

  /// Fetch stats and CI outcome for each default-branch commit
  #[arg(long)]
  pub commit_details: bool,

  /// Maximum requests in flight
  #[arg(long)]
  pub max_concurrent: Option<usize>,

  /// Minimum gap between dispatches, in milliseconds
  #[arg(long)]
  pub min_spacing_ms: Option<u64>,

  /// Upper bound on pages walked per unbounded listing
  #[arg(long, default_value_t = DEFAULT_PAGE_CEILING)]
  pub max_pages: u32,

  /// Output file (default stdout "-")
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Log progress at info level (RUST_LOG overrides)
  #[arg(long, short)]
  pub verbose: bool,

  /// Override the "now" instant used to close an open window (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EffectiveConfig {
  pub owner: String,
  pub repo: String,
  pub window: WindowSpec,
  #[serde(skip)]
  pub token: Option<String>,
  pub api_url: String,
  pub all_branches: bool,
  pub commit_details: bool,
  pub max_concurrent: Option<usize>,
  pub min_spacing_ms: Option<u64>,
  pub max_pages: u32,
  pub out: String,
  pub verbose: bool,
  pub now_override: Option<String>,
}

impl EffectiveConfig {
  pub fn options(&self) -> AnalyzeOptions {
    AnalyzeOptions {
      all_branches: self.all_branches,
      commit_details: self.commit_details,
      page_ceiling: self.max_pages,
    }
  }

  /// Credential-sized defaults with the CLI overrides applied.
  pub fn budget(&self, authenticated: bool) -> RequestBudget {
    let mut budget = RequestBudget::for_credential(authenticated);
    if let Some(n) = self.max_concurrent {
      budget.max_concurrent = n;
    }
    if let Some(ms) = self.min_spacing_ms {
      budget.min_spacing = Duration::from_millis(ms);
    }
    budget
  }
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let (owner, repo) = parse_slug(&cli.repository).with_context(|| format!("repository argument {:?}", cli.repository))?;

  // Validate window selection
  let window = match (&cli.month, &cli.since, &cli.until) {
    (Some(ym), None, None) => WindowSpec::Month { ym: ym.clone() },
    (None, Some(s), u) => WindowSpec::SinceUntil {
      since: s.clone(),
      until: u.clone(),
    },
    (None, None, Some(_)) => bail!("--until needs --since"),
    (None, None, None) => bail!("Provide one of --month or --since [--until]"),
    _ => bail!("Ambiguous time selection: choose only one of --month | --since/--until"),
  };

  if cli.max_concurrent == Some(0) {
    bail!("--max-concurrent must be at least 1");
  }

  Ok(EffectiveConfig {
    owner,
    repo,
    window,
    token: cli.token.filter(|t| !t.trim().is_empty()),
    api_url: cli.api_url,
    all_branches: cli.all_branches,
    commit_details: cli.commit_details,
    max_concurrent: cli.max_concurrent,
    min_spacing_ms: cli.min_spacing_ms,
    max_pages: cli.max_pages,
    out: cli.out,
    verbose: cli.verbose,
    now_override: cli.now_override,
  })
}
