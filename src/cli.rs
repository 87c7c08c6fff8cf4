// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Command-line and environment configuration; validation into an EffectiveConfig
// role: cli/config
// inputs: Flags, env vars (GITHUB_TOKEN, GITHUB_REPO_OWNER, GITHUB_REPO_NAME, GOOGLE_API_KEY, TEST_MILESTONE_TITLE, GEMINI_MODEL, GITHUB_API_URL), .env via main
// outputs: EffectiveConfig with a Mode carrying exactly the credentials that mode needs
// invariants:
// - Flags override env vars; blank values count as missing
// - Every missing required setting is reported at once
// - GitHub token falls back to GH_TOKEN, then `gh auth token`
// errors: ConfigError (typed); main maps it to exit code 2
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::Parser;
use thiserror::Error;

use crate::analysis::client::DEFAULT_MODEL;
use crate::forge::{get_github_token, GITHUB_API_BASE};
use crate::model::RepoRef;

pub const DEFAULT_MILESTONE: &str = "Sprint-1";

#[derive(Parser, Debug)]
#[command(
  name = "release-readiness",
  version,
  about = "Score a milestone's release readiness from GitHub activity with Gemini",
  long_about = None
)]
pub struct Cli {
  /// GitHub token (falls back to GH_TOKEN, then `gh auth token`)
  #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
  pub github_token: Option<String>,

  /// Repository owner (user or organisation)
  #[arg(long, env = "GITHUB_REPO_OWNER")]
  pub owner: Option<String>,

  /// Repository name
  #[arg(long, env = "GITHUB_REPO_NAME")]
  pub repo: Option<String>,

  /// Google Generative Language API key
  #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
  pub google_api_key: Option<String>,

  /// Title of the open milestone to analyze
  #[arg(long, env = "TEST_MILESTONE_TITLE", default_value = DEFAULT_MILESTONE)]
  pub milestone: String,

  /// Gemini model name
  #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
  pub model: String,

  /// GitHub REST API base URL (GitHub Enterprise: https://<host>/api/v3); PR links in comments are matched on the web host derived from it
  #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_BASE)]
  pub github_api_url: String,

  /// Directory for the JSON report
  #[arg(long, default_value = "reports")]
  pub out_dir: PathBuf,

  /// Print the console report for a saved JSON report instead of running the analysis
  #[arg(long, conflicts_with = "list_models")]
  pub from_report: Option<PathBuf>,

  /// List Gemini models available to the API key
  #[arg(long)]
  pub list_models: bool,

  /// Emit logs as JSON lines on stderr
  #[arg(long)]
  pub json_logs: bool,

  /// Debug-level logging (RUST_LOG takes precedence)
  #[arg(short, long)]
  pub verbose: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the timestamp used in the report file name (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("{} must be set in the environment, a .env file, or via command-line flags", .names.join(", "))]
  Missing { names: Vec<&'static str> },

  #[error("invalid value for {name}: {reason}")]
  Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Run {
    github_token: String,
    repo: RepoRef,
    google_api_key: String,
  },
  FromReport {
    path: PathBuf,
  },
  ListModels {
    google_api_key: String,
  },
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
  pub mode: Mode,
  pub milestone: String,
  pub model: String,
  pub github_api_url: String,
  pub out_dir: PathBuf,
  pub now: Option<DateTime<Local>>,
}

fn present(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_now(raw: Option<&str>) -> Result<Option<DateTime<Local>>, ConfigError> {
  let Some(raw) = raw else { return Ok(None) };

  let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S").map_err(|e| ConfigError::Invalid {
    name: "--now-override",
    reason: format!("{} (expected YYYY-MM-DDTHH:MM:SS)", e),
  })?;

  Local
    .from_local_datetime(&naive)
    .earliest()
    .map(Some)
    .ok_or_else(|| ConfigError::Invalid {
      name: "--now-override",
      reason: "not a valid local time".into(),
    })
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig, ConfigError> {
  normalize_with(cli, get_github_token)
}

/// `normalize` with an injectable token fallback.
pub fn normalize_with<F>(cli: Cli, token_fallback: F) -> Result<EffectiveConfig, ConfigError>
where
  F: FnOnce() -> Option<String>,
{
  let milestone = cli.milestone.trim().to_string();

  if milestone.is_empty() {
    return Err(ConfigError::Invalid {
      name: "TEST_MILESTONE_TITLE",
      reason: "milestone title is empty".into(),
    });
  }

  let google_api_key = present(cli.google_api_key);

  let mode = if let Some(path) = cli.from_report {
    Mode::FromReport { path }
  } else if cli.list_models {
    let google_api_key = google_api_key.ok_or(ConfigError::Missing {
      names: vec!["GOOGLE_API_KEY"],
    })?;
    Mode::ListModels { google_api_key }
  } else {
    let github_token = present(cli.github_token).or_else(token_fallback);
    let owner = present(cli.owner);
    let repo = present(cli.repo);

    let mut missing = Vec::new();

    if github_token.is_none() {
      missing.push("GITHUB_TOKEN");
    }
    if owner.is_none() {
      missing.push("GITHUB_REPO_OWNER");
    }
    if repo.is_none() {
      missing.push("GITHUB_REPO_NAME");
    }
    if google_api_key.is_none() {
      missing.push("GOOGLE_API_KEY");
    }

    match (github_token, owner, repo, google_api_key) {
      (Some(github_token), Some(owner), Some(repo), Some(google_api_key)) => Mode::Run {
        github_token,
        repo: RepoRef::new(owner, repo),
        google_api_key,
      },
      _ => return Err(ConfigError::Missing { names: missing }),
    }
  };

  Ok(EffectiveConfig {
    mode,
    milestone,
    model: cli.model.trim().to_string(),
    github_api_url: cli.github_api_url.trim().to_string(),
    out_dir: cli.out_dir,
    now: parse_now(cli.now_override.as_deref())?,
  })
}
