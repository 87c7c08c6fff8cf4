// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Execute one CLI invocation: full analysis run, saved-report re-render, or model listing
// role: processing/orchestrator
// inputs: EffectiveConfig; a writer for the console output
// outputs: Outcome; JSON report on disk for a completed run; console text on the writer
// side_effects: Network calls through forge and model backends; writes the report file
// invariants:
// - The JSON file is written before the console report is printed
// - No file is written when there is nothing to report or when any step fails
// errors: Propagated with context to main (exit code 1)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::aggregate::Aggregator;
use crate::analysis::client::{build_client, GeminiBackend};
use crate::analysis::Analyzer;
use crate::cli::{EffectiveConfig, Mode};
use crate::forge;
use crate::render::{console_report, load_report, write_json_report};
use crate::util::effective_now;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Reported(PathBuf),
  NoReport,
  Rendered,
  ModelsListed(usize),
}

pub fn execute<W: Write>(cfg: &EffectiveConfig, out: &mut W) -> Result<Outcome> {
  match &cfg.mode {
    Mode::FromReport { path } => {
      let report = load_report(path)?;
      writeln!(out, "{}", console_report(&report))?;

      Ok(Outcome::Rendered)
    }

    Mode::ListModels { google_api_key } => {
      let models = GeminiBackend::new(google_api_key.as_str(), cfg.model.as_str()).list_models()?;

      for m in &models {
        let support = if m.supports_generate_content {
          "Supports generateContent"
        } else {
          "Does NOT support generateContent"
        };
        writeln!(out, "- {} ({})", m.name, support)?;
      }

      Ok(Outcome::ModelsListed(models.len()))
    }

    Mode::Run {
      github_token,
      repo,
      google_api_key,
    } => {
      // Phase 1: collaborators, built once and shared by reference
      let forge = forge::build_api(github_token, repo.clone(), &cfg.github_api_url)?;
      let client = build_client(google_api_key, &cfg.model)?;

      // Phase 2: retrieval and bottom-up analysis
      let aggregator = Aggregator::new(forge.as_ref(), Analyzer::new(&client));

      let Some(report) = aggregator.run(&cfg.milestone)? else {
        writeln!(
          out,
          "No report generated: milestone '{}' was not found, is closed, or has no issues.",
          cfg.milestone
        )?;
        return Ok(Outcome::NoReport);
      };

      // Phase 3: persist, then print
      let path = write_json_report(&report, &cfg.out_dir, effective_now(cfg.now))?;
      tracing::info!(path = %path.display(), "analysis report saved");

      writeln!(out, "{}", console_report(&report))?;

      Ok(Outcome::Reported(path))
    }
  }
}
