// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn a model's markdown-like answer into a typed AnalysisResult (score, justification, improvements)
// role: analysis/parser
// inputs: Tier (selects the score label) and raw model text
// outputs: AnalysisResult; missing sections degrade to None / empty
// invariants:
// - Pure and idempotent; never panics or errors on any input
// - Improvements keep only `- ` bullet lines, in original order, prefix stripped
// - One termination rule for the improvements block in every tier: next capitalized header line or end of text
// - Header rules track the output contract written into analysis::prompts (TEMPLATE_VERSION)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{AnalysisResult, Tier};

// Leading decoration a model may put in front of a header: markdown emphasis, headings, quotes, bullets.
const LEAD: &str = r"^[ \t>#*_-]*";
// Decoration between label, colon and value, e.g. `**Justification:** text`.
const MID: &str = r"[ \t*_]*";

fn score_pattern(label: &str) -> Regex {
  let pattern = format!(r"(?mi){LEAD}{label}{MID}:{MID}\[?(\d{{1,3}})");
  Regex::new(&pattern).unwrap()
}

static RE_COMMIT_SCORE: Lazy<Regex> = Lazy::new(|| score_pattern(Tier::Commit.score_label()));
static RE_PR_SCORE: Lazy<Regex> = Lazy::new(|| score_pattern(Tier::PullRequest.score_label()));
static RE_MILESTONE_SCORE: Lazy<Regex> = Lazy::new(|| score_pattern(Tier::Milestone.score_label()));

static RE_JUSTIFICATION: Lazy<Regex> =
  Lazy::new(|| Regex::new(&format!(r"(?mi){LEAD}Justification{MID}:{MID}")).unwrap());

// "Suggestions for Improvement" is the header older prompt revisions asked for.
static RE_IMPROVEMENTS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"(?mi){LEAD}(?:Actionable Improvements|Suggestions for Improvement){MID}:{MID}"
  ))
  .unwrap()
});

// A line that opens some other section, e.g. `Risks:` or `**Next Steps:**`.
static RE_NEW_HEADER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[#*_ \t]*[A-Z][A-Za-z0-9 ()/'&-]{0,60}[*_]*:").unwrap());

fn score_regex(tier: Tier) -> &'static Regex {
  match tier {
    Tier::Commit => &RE_COMMIT_SCORE,
    Tier::PullRequest => &RE_PR_SCORE,
    Tier::Milestone => &RE_MILESTONE_SCORE,
  }
}

/// Parse a raw model response for `tier`.
pub fn parse(tier: Tier, raw: &str) -> AnalysisResult {
  let score = extract_score(tier, raw);
  let improvements_header = RE_IMPROVEMENTS.find(raw);

  let mut justification = extract_justification(raw);
  let mut improvements = improvements_header
    .map(|m| collect_bullets(&raw[m.end()..]))
    .unwrap_or_default();

  if tier == Tier::Milestone && improvements_header.is_some() {
    let (kept, moved) = split_trailing_bullets(&justification);
    if !moved.is_empty() {
      justification = kept;
      improvements.splice(0..0, moved);
    }
  }

  AnalysisResult {
    tier,
    score,
    justification,
    improvements,
  }
}

fn extract_score(tier: Tier, raw: &str) -> Option<u8> {
  let caps = score_regex(tier).captures(raw)?;
  let n: u32 = caps.get(1)?.as_str().parse().ok()?;
  Some(n.min(100) as u8)
}

fn extract_justification(raw: &str) -> String {
  let Some(header) = RE_JUSTIFICATION.find(raw) else {
    return String::new();
  };
  let start = header.end();

  let end = RE_IMPROVEMENTS
    .find_iter(raw)
    .map(|m| m.start())
    .find(|&s| s >= start)
    .unwrap_or(raw.len());

  raw[start..end].trim().to_string()
}

/// Bullet items from the lines following an improvements header.
fn collect_bullets(after_header: &str) -> Vec<String> {
  // The header line itself ends at the first newline; items start on the next line.
  let body = match after_header.find('\n') {
    Some(i) => &after_header[i + 1..],
    None => return Vec::new(),
  };

  let mut out = Vec::new();

  for line in body.lines() {
    let trimmed = line.trim();

    if let Some(item) = trimmed.strip_prefix("- ") {
      let item = item.trim();
      if !item.is_empty() {
        out.push(item.to_string());
      }
    } else if RE_NEW_HEADER.is_match(trimmed) {
      break;
    }
  }

  out
}

/// Split a trailing block of `- ` lines off the end of a justification.
fn split_trailing_bullets(justification: &str) -> (String, Vec<String>) {
  let lines: Vec<&str> = justification.lines().collect();
  let mut cut = lines.len();

  while cut > 0 {
    let t = lines[cut - 1].trim();
    if t.starts_with("- ") || (t.is_empty() && cut < lines.len()) {
      cut -= 1;
    } else {
      break;
    }
  }

  let moved: Vec<String> = lines[cut..]
    .iter()
    .filter_map(|l| l.trim().strip_prefix("- "))
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect();

  (lines[..cut].join("\n").trim().to_string(), moved)
}
