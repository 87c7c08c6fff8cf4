// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Configure the global tracing subscriber (EnvFilter, plain or JSON lines) on stderr
// role: telemetry/init
// inputs: json flag; default level; RUST_LOG
// outputs: Global subscriber installed once per process
// invariants:
// - Logs go to stderr; stdout carries only the report
// - RUST_LOG wins over the default level; repeat calls are ignored
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(json: bool, level: Level) {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

  if json {
    tracing_subscriber::registry()
      .with(env_filter)
      .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
      .try_init()
      .ok();
  } else {
    tracing_subscriber::registry()
      .with(env_filter)
      .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
      .try_init()
      .ok();
  }
}

/// `debug` when verbose, `info` otherwise.
pub fn default_level(verbose: bool) -> Level {
  if verbose {
    Level::DEBUG
  } else {
    Level::INFO
  }
}
