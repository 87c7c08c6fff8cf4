// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build each tier's aggregate text blob, render its template, call the model, parse, and store the result
// role: analysis/analyzers
// inputs: &mut CommitRecord / PullRequestRecord / MilestoneReport; shared &TextGenerationClient; SnippetLimits
// outputs: The record's analysis field set exactly once
// invariants:
// - Strictly bottom-up: PR blobs embed commit scores, milestone blobs embed PR and commit scores
// - A record that already carries an analysis is left untouched (no second model call)
// - Clipping never splits UTF-8 (util::clip_text)
// errors: TemplateError only (slot mismatch); model and parse failures are absorbed upstream
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use crate::analysis::client::TextGenerationClient;
use crate::analysis::parser;
use crate::analysis::prompts::{self, TemplateError};
use crate::model::{AnalysisResult, CommentRecord, CommitRecord, MilestoneReport, PullRequestRecord, ReviewRecord, Tier};
use crate::util::{one_line, snippet};

pub const NO_REVIEW_COMMENTS: &str = "No specific review comments provided for this commit.";
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Byte limits applied when building prompt blobs. Zero disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetLimits {
  /// Diff sent with a single commit.
  pub commit_diff: usize,
  /// Diff excerpt per commit in the PR blob.
  pub pr_diff_excerpt: usize,
  /// PR justification quoted in the milestone blob.
  pub justification: usize,
  /// Each improvement quoted in the milestone blob.
  pub improvement: usize,
  /// Each issue comment quoted in the milestone blob.
  pub comment: usize,
}

impl Default for SnippetLimits {
  fn default() -> Self {
    Self {
      commit_diff: 12_000,
      pr_diff_excerpt: 300,
      justification: 300,
      improvement: 150,
      comment: 200,
    }
  }
}

pub struct Analyzer<'a> {
  client: &'a TextGenerationClient,
  limits: SnippetLimits,
}

impl<'a> Analyzer<'a> {
  pub fn new(client: &'a TextGenerationClient) -> Self {
    Self::with_limits(client, SnippetLimits::default())
  }

  pub fn with_limits(client: &'a TextGenerationClient, limits: SnippetLimits) -> Self {
    Self { client, limits }
  }

  pub fn limits(&self) -> SnippetLimits {
    self.limits
  }

  fn score(&self, tier: Tier, values: &[(&str, &str)]) -> Result<AnalysisResult, TemplateError> {
    let prompt = prompts::render(tier, values)?;
    let raw = self.client.generate(tier, &prompt);

    Ok(parser::parse(tier, &raw))
  }

  pub fn analyze_commit(&self, commit: &mut CommitRecord, review_comments: &str) -> Result<(), TemplateError> {
    if commit.analysis.is_some() {
      return Ok(());
    }

    let diff = snippet(&commit.diff, self.limits.commit_diff);
    let result = self.score(
      Tier::Commit,
      &[
        ("commit_message", commit.message.as_str()),
        ("commit_diff", diff.as_str()),
        ("review_comments", review_comments),
      ],
    )?;

    tracing::info!(sha = %commit.short_sha(), score = %result.score_text(), "commit analyzed");
    commit.analysis = Some(result);

    Ok(())
  }

  pub fn analyze_pull_request(&self, pr: &mut PullRequestRecord) -> Result<(), TemplateError> {
    if pr.analysis.is_some() {
      return Ok(());
    }

    let description = pr
      .description
      .as_deref()
      .filter(|d| !d.trim().is_empty())
      .unwrap_or(NO_DESCRIPTION);
    let commits = commit_summaries(&pr.commits, self.limits.pr_diff_excerpt);
    let discussion = discussion(&pr.reviews, &pr.comments);

    let result = self.score(
      Tier::PullRequest,
      &[
        ("pr_title", pr.title.as_str()),
        ("pr_description", description),
        ("commit_summaries", commits.as_str()),
        ("discussion", discussion.as_str()),
      ],
    )?;

    tracing::info!(pr = pr.number, score = %result.score_text(), "pull request analyzed");
    pr.analysis = Some(result);

    Ok(())
  }

  pub fn analyze_milestone(&self, report: &mut MilestoneReport) -> Result<(), TemplateError> {
    if report.analysis.is_some() {
      return Ok(());
    }

    let summary = milestone_summary(report, &self.limits);
    let result = self.score(
      Tier::Milestone,
      &[
        ("milestone_title", report.milestone_title.as_str()),
        ("milestone_summary", summary.as_str()),
      ],
    )?;

    tracing::info!(milestone = %report.milestone_title, score = %result.score_text(), "milestone analyzed");
    report.analysis = Some(result);

    Ok(())
  }
}

fn score_of(analysis: Option<&AnalysisResult>) -> String {
  analysis.map(AnalysisResult::score_text).unwrap_or_else(|| "N/A".into())
}

/// `Review by <user> (<STATE>): <body>` lines for a PR, or the placeholder when there are none.
pub fn review_text(reviews: &[ReviewRecord]) -> String {
  if reviews.is_empty() {
    return NO_REVIEW_COMMENTS.to_string();
  }

  reviews
    .iter()
    .map(|r| {
      let state = r.state.as_deref().unwrap_or("COMMENTED");
      let body = if r.body.trim().is_empty() { "(no comment)" } else { r.body.trim() };
      format!("Review by {} ({}): {}", r.user, state, body)
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// One entry per commit: short sha, subject, commit-tier score, indented diff excerpt.
pub fn commit_summaries(commits: &[CommitRecord], diff_excerpt: usize) -> String {
  if commits.is_empty() {
    return "No commits found for this pull request.".to_string();
  }

  let mut out = String::new();

  for c in commits {
    out.push_str(&format!(
      "- {} {} [Confidence Score: {}]\n",
      c.short_sha(),
      c.subject(),
      score_of(c.analysis.as_ref())
    ));

    let excerpt = snippet(&c.diff, diff_excerpt);

    for line in excerpt.lines() {
      out.push_str("    ");
      out.push_str(line);
      out.push('\n');
    }
  }

  out.trim_end().to_string()
}

/// Reviews followed by general comments.
pub fn discussion(reviews: &[ReviewRecord], comments: &[CommentRecord]) -> String {
  let mut out = String::from("Reviews:\n");

  if reviews.is_empty() {
    out.push_str("No reviews.\n");
  } else {
    out.push_str(&review_text(reviews));
    out.push('\n');
  }

  out.push_str("\nGeneral comments:\n");

  if comments.is_empty() {
    out.push_str("No general comments.");
  } else {
    let lines: Vec<String> = comments.iter().map(|c| format!("- {}: {}", c.user, c.body.trim())).collect();
    out.push_str(&lines.join("\n"));
  }

  out
}

/// Per-issue and per-PR digest fed to the milestone template.
pub fn milestone_summary(report: &MilestoneReport, limits: &SnippetLimits) -> String {
  if report.issues.is_empty() {
    return "No issues in this milestone.".to_string();
  }

  let mut out: Vec<String> = Vec::new();

  for issue in report.issues.values() {
    out.push(format!("Issue #{}: {} [{}]", issue.number, issue.title, issue.state));

    for c in &issue.comments {
      out.push(format!("  Comment by {}: {}", c.user, snippet(&one_line(&c.body), limits.comment)));
    }

    if issue.associated_prs.is_empty() {
      out.push("  No linked pull requests.".to_string());
    }

    for pr in issue.associated_prs.values() {
      out.push(format!(
        "  PR #{}: {} [{}] Release Readiness Score: {}",
        pr.number,
        pr.title,
        pr.state,
        score_of(pr.analysis.as_ref())
      ));

      if let Some(a) = &pr.analysis {
        out.push(format!(
          "    Justification: {}",
          snippet(&one_line(&a.justification), limits.justification)
        ));

        for imp in &a.improvements {
          out.push(format!("    Improvement: {}", snippet(&one_line(imp), limits.improvement)));
        }
      }

      for c in &pr.commits {
        out.push(format!(
          "    Commit {} {}: Confidence Score {}",
          c.short_sha(),
          c.subject(),
          score_of(c.analysis.as_ref())
        ));
      }
    }

    out.push(String::new());
  }

  out.join("\n").trim_end().to_string()
}
