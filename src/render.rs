// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Persist the MilestoneReport as pretty JSON and render the human-readable console report
// role: rendering/report
// inputs: MilestoneReport; output directory; timestamp for the file name
// outputs: JSON file path; console report text; a MilestoneReport loaded back from disk
// side_effects: Creates the output directory and writes one JSON file per run
// invariants:
// - Console text is a pure function of the report (same report → same text)
// - Milestone analysis first, then issues and PRs in ascending number order
// - Quoted bodies are clipped on UTF-8 boundaries with a trailing `...`
// errors: IO and JSON errors bubble with path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::analysis::analyzers::NO_DESCRIPTION;
use crate::model::{AnalysisResult, CommitRecord, IssueRecord, MilestoneReport, PullRequestRecord};
use crate::util::{one_line, prepare_out_dir, report_file_name, snippet};

const QUOTE_LIMIT: usize = 100;
const SUMMARY_LIMIT: usize = 150;

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();

  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Write `report` to `<out_dir>/milestone_<title>_analysis_<timestamp>.json`.
pub fn write_json_report(report: &MilestoneReport, out_dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
  let dir = prepare_out_dir(out_dir)?;
  let path = dir.join(report_file_name(&report.milestone_title, now));
  let bytes = serde_json::to_vec_pretty(report).context("serializing milestone report")?;
  std::fs::write(&path, bytes).with_context(|| format!("writing report {}", path.display()))?;

  Ok(path)
}

/// Read a report previously written by `write_json_report`.
pub fn load_report(path: &Path) -> Result<MilestoneReport> {
  let data = std::fs::read(path).with_context(|| format!("reading report {}", path.display()))?;

  serde_json::from_slice(&data).with_context(|| format!("parsing report {}", path.display()))
}

/// Human-readable report, milestone verdict first.
pub fn console_report(report: &MilestoneReport) -> String {
  let mut lines: Vec<String> = Vec::new();
  let title = &report.milestone_title;

  lines.push(format!("--- Release Readiness Report for Milestone: {} ---", title));
  lines.push("-".repeat(title.chars().count() + 40));

  match &report.analysis {
    Some(a) => push_milestone_analysis(&mut lines, a),
    None => {
      lines.push(String::new());
      lines.push("No overall milestone LLM analysis available.".into());
    }
  }

  if report.issues.is_empty() {
    lines.push(String::new());
    lines.push("No issues found for this milestone.".into());
    return lines.join("\n");
  }

  for issue in report.issues.values() {
    push_issue(&mut lines, issue);
  }

  lines.push(String::new());
  lines.push("--- End of Report ---".into());

  lines.join("\n")
}

fn push_milestone_analysis(lines: &mut Vec<String>, a: &AnalysisResult) {
  lines.push(String::new());
  lines.push("## Overall Milestone Release Confidence".into());
  lines.push(format!("   Release Confidence Score: {}/100", a.score_text()));
  lines.push("   Justification:".into());

  if a.justification.is_empty() {
    lines.push("     No justification provided.".into());
  }

  for line in a.justification.lines() {
    lines.push(format!("     {}", line.trim()));
  }

  if !a.improvements.is_empty() {
    lines.push("   Actionable Improvements:".into());

    for rec in &a.improvements {
      lines.push(format!("     - {}", rec));
    }
  }

  lines.push(String::new());
  lines.push("=".repeat(50));
  lines.push(String::new());
}

fn push_issue(lines: &mut Vec<String>, issue: &IssueRecord) {
  lines.push(String::new());
  lines.push(format!("## Issue #{}: {}", issue.number, issue.title));
  lines.push(format!("   Status: {}", capitalize(&issue.state)));
  lines.push(format!("   URL: {}", issue.url));

  if !issue.comments.is_empty() {
    lines.push("   Issue Comments:".into());

    for c in &issue.comments {
      lines.push(format!("     - {}: {}", c.user, snippet(&c.body, QUOTE_LIMIT)));
    }
  }

  if issue.associated_prs.is_empty() {
    lines.push("   No associated Pull Requests.".into());
    return;
  }

  lines.push(String::new());
  lines.push("   Associated Pull Requests:".into());

  for pr in issue.associated_prs.values() {
    push_pull_request(lines, pr);
  }
}

fn push_pull_request(lines: &mut Vec<String>, pr: &PullRequestRecord) {
  lines.push(format!("   --- PR #{}: {} ---", pr.number, pr.title));
  lines.push(format!("     URL: {}", pr.url));
  lines.push(format!("     Status: {}", capitalize(&pr.state)));
  lines.push(format!("     Author: {}", pr.user));

  let description = pr
    .description
    .as_deref()
    .filter(|d| !d.trim().is_empty())
    .unwrap_or(NO_DESCRIPTION);
  let first_line = description.lines().next().unwrap_or("");
  lines.push(format!("     Description: {}", snippet(first_line, QUOTE_LIMIT)));

  lines.push(String::new());

  match &pr.analysis {
    Some(a) => {
      lines.push("     --- PR LLM Analysis ---".into());
      lines.push(format!("     Release Readiness Score: {}/100", a.score_text()));
      lines.push("     Justification:".into());

      for line in a.justification.lines() {
        lines.push(format!("       {}", line));
      }

      if !a.improvements.is_empty() {
        lines.push("     Actionable Improvements:".into());

        for imp in &a.improvements {
          lines.push(format!("       - {}", imp));
        }
      }
    }
    None => lines.push("     No PR-level LLM analysis available.".into()),
  }

  lines.push(String::new());

  if pr.commits.is_empty() {
    lines.push("     No commits found for this PR.".into());
  } else {
    lines.push("     --- Commit-Level Analysis Summary ---".into());

    for c in &pr.commits {
      push_commit(lines, c);
    }
  }

  if !pr.reviews.is_empty() {
    lines.push(String::new());
    lines.push("     Reviews:".into());

    for r in &pr.reviews {
      lines.push(format!(
        "       - {} ({}): {}",
        r.user,
        r.state.as_deref().unwrap_or("UNKNOWN"),
        snippet(&r.body, QUOTE_LIMIT)
      ));
    }
  }

  if !pr.comments.is_empty() {
    lines.push(String::new());
    lines.push("     General PR Comments:".into());

    for c in &pr.comments {
      lines.push(format!("       - {}: {}", c.user, snippet(&c.body, QUOTE_LIMIT)));
    }
  }

  lines.push(String::new());
  lines.push("-".repeat(50));
  lines.push(String::new());
}

fn push_commit(lines: &mut Vec<String>, c: &CommitRecord) {
  lines.push(format!("     Commit: {} - {}", c.short_sha(), c.subject()));

  let Some(a) = &c.analysis else {
    lines.push("       No commit-level LLM analysis.".into());
    return;
  };

  lines.push(format!("       Confidence Score: {}", a.score_text()));
  lines.push(format!(
    "       Justification Summary: {}",
    snippet(&one_line(&a.justification), SUMMARY_LIMIT)
  ));

  if !a.improvements.is_empty() {
    lines.push(format!(
      "       Actionable Improvements: {}",
      snippet(&a.improvements.join("; "), SUMMARY_LIMIT)
    ));
  }
}
