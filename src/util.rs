// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for text clipping, report naming, output directories, and man page rendering
// role: utilities/helpers
// inputs: Various primitives; DateTime; paths; clap CommandFactory
// outputs: Clipped text, report file names, directories ensured, man page text
// side_effects: prepare_out_dir creates directories
// invariants:
// - clip_text never splits UTF-8; indicates clipping accurately
// - report_file_name pattern is stable and locale-independent
// errors: IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::CommandFactory;

/// Generates a short 7-character SHA from a full one.
pub fn short_sha(full: &str) -> String {
  full.chars().take(7).collect()
}

/// Clips text to at most `max_bytes` bytes without splitting a UTF-8 character.
/// Returns the clipped text and whether anything was cut. `max_bytes == 0` means no limit.
pub fn clip_text(text: &str, max_bytes: usize) -> (&str, bool) {
  if max_bytes == 0 || text.len() <= max_bytes {
    return (text, false);
  }

  let mut end = max_bytes;

  while end > 0 && !text.is_char_boundary(end) {
    end -= 1;
  }

  (&text[..end], true)
}

/// Clip and append an ellipsis marker when text was cut.
pub fn snippet(text: &str, max_bytes: usize) -> String {
  match clip_text(text, max_bytes) {
    (s, true) => format!("{}...", s),
    (s, false) => s.to_string(),
  }
}

/// Collapse internal newlines so a value fits on one report line.
pub fn one_line(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the effective "now" given an optional override.
pub fn effective_now(override_now: Option<DateTime<Local>>) -> DateTime<Local> {
  override_now.unwrap_or_else(Local::now)
}

/// File name for a persisted milestone report, e.g. `milestone_Sprint_1_analysis_20250815_120000.json`.
/// Spaces and path separators in the title become `_` so the name stays a single path component.
pub fn report_file_name(milestone_title: &str, now: DateTime<Local>) -> String {
  let title: String = milestone_title
    .chars()
    .map(|c| if matches!(c, ' ' | '/' | '\\') { '_' } else { c })
    .collect();

  format!("milestone_{}_analysis_{}.json", title, now.format("%Y%m%d_%H%M%S"))
}

/// Ensure the report output directory exists and return it.
pub fn prepare_out_dir(out: &Path) -> Result<PathBuf> {
  let dir = out.to_path_buf();
  std::fs::create_dir_all(&dir).with_context(|| format!("creating output directory {}", dir.display()))?;

  Ok(dir)
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
