use std::process::ExitCode;

use clap::Parser;

use release_readiness::cli::{normalize, Cli};
use release_readiness::{app, telemetry, util};

fn main() -> ExitCode {
  // A missing .env is fine; real env vars still apply.
  dotenvy::dotenv().ok();

  let cli = Cli::parse();

  if cli.gen_man {
    return match util::render_man_page::<Cli>() {
      Ok(page) => {
        print!("{}", page);
        ExitCode::SUCCESS
      }
      Err(e) => {
        eprintln!("An unexpected error occurred: {e:#}");
        ExitCode::from(1)
      }
    };
  }

  telemetry::init_tracing(cli.json_logs, telemetry::default_level(cli.verbose));

  // Phase 1: normalize configuration
  let cfg = match normalize(cli) {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Configuration Error: {e}");
      return ExitCode::from(2);
    }
  };

  // Phase 2: execute
  let mut stdout = std::io::stdout().lock();

  match app::execute(&cfg, &mut stdout) {
    Ok(outcome) => {
      tracing::debug!(?outcome, "done");
      ExitCode::SUCCESS
    }
    Err(e) => {
      tracing::error!(error = %format!("{e:#}"), "run failed");
      eprintln!("An unexpected error occurred: {e:#}");
      ExitCode::from(1)
    }
  }
}
