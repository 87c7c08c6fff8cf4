// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the milestone report tree (issues, PRs, commits, reviews, comments) and the tiered analysis result
// role: model/types
// outputs: Serializable records with stable field names matching the persisted report JSON
// invariants:
// - Each analysable record carries at most one AnalysisResult; set once, never replaced
// - AnalysisResult serializes its score under the tier-specific key
// - Reviews on a PR are unique by (user, state, body); first occurrence order kept
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashSet};

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Placeholder stored in `CommitRecord::diff` when the forge has no patch text.
pub const NO_DIFF_AVAILABLE: &str = "No diff available.";

/// The three levels of aggregation and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
  Commit,
  PullRequest,
  Milestone,
}

impl Tier {
  pub const ALL: [Tier; 3] = [Tier::Commit, Tier::PullRequest, Tier::Milestone];

  /// Header label the model is asked to emit in front of the score.
  pub fn score_label(&self) -> &'static str {
    match self {
      Tier::Commit => "Confidence Score",
      Tier::PullRequest => "Release Readiness Score",
      Tier::Milestone => "Release Confidence Score",
    }
  }

  /// JSON key used for the score in the persisted report.
  pub fn score_field(&self) -> &'static str {
    match self {
      Tier::Commit => "confidence_score",
      Tier::PullRequest => "release_readiness_score",
      Tier::Milestone => "release_confidence_score",
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Tier::Commit => "commit",
      Tier::PullRequest => "pull_request",
      Tier::Milestone => "milestone",
    }
  }
}

impl std::fmt::Display for Tier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Parsed outcome of one scoring call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
  pub tier: Tier,
  pub score: Option<u8>,
  pub justification: String,
  pub improvements: Vec<String>,
}

impl AnalysisResult {
  pub fn empty(tier: Tier) -> Self {
    Self {
      tier,
      score: None,
      justification: String::new(),
      improvements: Vec::new(),
    }
  }

  /// Score as display text, `N/A` when the model gave none.
  pub fn score_text(&self) -> String {
    self.score.map(|s| s.to_string()).unwrap_or_else(|| "N/A".into())
  }
}

impl Serialize for AnalysisResult {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(3))?;
    map.serialize_entry(self.tier.score_field(), &self.score)?;
    map.serialize_entry("justification", &self.justification)?;
    map.serialize_entry("actionable_improvements", &self.improvements)?;
    map.end()
  }
}

/// Wire shape shared by the three tiers; only one score key is ever present.
#[derive(Deserialize)]
struct AnalysisWire {
  #[serde(default)]
  confidence_score: Option<u8>,
  #[serde(default)]
  release_readiness_score: Option<u8>,
  #[serde(default)]
  release_confidence_score: Option<u8>,
  #[serde(default)]
  justification: String,
  #[serde(default)]
  actionable_improvements: Vec<String>,
}

impl AnalysisWire {
  fn into_result(self, tier: Tier) -> AnalysisResult {
    let score = match tier {
      Tier::Commit => self.confidence_score,
      Tier::PullRequest => self.release_readiness_score,
      Tier::Milestone => self.release_confidence_score,
    };
    AnalysisResult {
      tier,
      score,
      justification: self.justification,
      improvements: self.actionable_improvements,
    }
  }
}

fn de_tiered<'de, D: Deserializer<'de>>(deserializer: D, tier: Tier) -> Result<Option<AnalysisResult>, D::Error> {
  let wire = Option::<AnalysisWire>::deserialize(deserializer)?;
  Ok(wire.map(|w| w.into_result(tier)))
}

fn de_commit_analysis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<AnalysisResult>, D::Error> {
  de_tiered(d, Tier::Commit)
}

fn de_pr_analysis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<AnalysisResult>, D::Error> {
  de_tiered(d, Tier::PullRequest)
}

fn de_milestone_analysis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<AnalysisResult>, D::Error> {
  de_tiered(d, Tier::Milestone)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommentRecord {
  pub user: String,
  pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct ReviewRecord {
  pub user: String,
  pub state: Option<String>,
  pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CommitRecord {
  pub sha: String,
  pub message: String,
  pub author: String,
  pub date: String,
  pub diff: String,
  #[serde(
    rename = "llm_analysis",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "de_commit_analysis"
  )]
  pub analysis: Option<AnalysisResult>,
}

impl CommitRecord {
  pub fn short_sha(&self) -> String {
    crate::util::short_sha(&self.sha)
  }

  /// First line of the commit message.
  pub fn subject(&self) -> &str {
    self.message.lines().next().unwrap_or("")
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PullRequestRecord {
  pub number: u64,
  pub title: String,
  pub url: String,
  pub state: String,
  pub user: String,
  pub description: Option<String>,
  #[serde(default)]
  pub commits: Vec<CommitRecord>,
  #[serde(default)]
  pub reviews: Vec<ReviewRecord>,
  #[serde(default)]
  pub comments: Vec<CommentRecord>,
  #[serde(
    rename = "llm_pr_analysis",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "de_pr_analysis"
  )]
  pub analysis: Option<AnalysisResult>,
}

impl PullRequestRecord {
  pub fn from_summary(summary: PullRequestSummary) -> Self {
    Self {
      number: summary.number,
      title: summary.title,
      url: summary.url,
      state: summary.state,
      user: summary.user,
      description: summary.description,
      commits: Vec::new(),
      reviews: Vec::new(),
      comments: Vec::new(),
      analysis: None,
    }
  }

  /// Append reviews, skipping any whose (user, state, body) is already recorded.
  pub fn add_reviews<I: IntoIterator<Item = ReviewRecord>>(&mut self, reviews: I) {
    let mut seen: HashSet<ReviewRecord> = self.reviews.iter().cloned().collect();

    for review in reviews {
      if seen.insert(review.clone()) {
        self.reviews.push(review);
      }
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IssueRecord {
  pub number: u64,
  pub title: String,
  pub url: String,
  pub state: String,
  #[serde(default)]
  pub comments: Vec<CommentRecord>,
  #[serde(default)]
  pub associated_prs: BTreeMap<u64, PullRequestRecord>,
}

impl IssueRecord {
  pub fn from_summary(summary: &IssueSummary) -> Self {
    Self {
      number: summary.number,
      title: summary.title.clone(),
      url: summary.url.clone(),
      state: summary.state.clone(),
      comments: Vec::new(),
      associated_prs: BTreeMap::new(),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MilestoneReport {
  pub milestone_title: String,
  #[serde(default)]
  pub issues: BTreeMap<u64, IssueRecord>,
  #[serde(
    rename = "llm_milestone_analysis",
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "de_milestone_analysis"
  )]
  pub analysis: Option<AnalysisResult>,
}

impl MilestoneReport {
  pub fn new(title: &str) -> Self {
    Self {
      milestone_title: title.to_string(),
      issues: BTreeMap::new(),
      analysis: None,
    }
  }

  pub fn pull_request_count(&self) -> usize {
    self.issues.values().map(|i| i.associated_prs.len()).sum()
  }
}

// --- Forge-side summaries (inputs to record construction) ---

/// An open milestone located by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneHandle {
  pub number: u64,
  pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSummary {
  pub number: u64,
  pub title: String,
  pub url: String,
  pub state: String,
  /// GitHub lists pull requests among milestone issues; these are flagged here.
  pub is_pull_request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSummary {
  pub number: u64,
  pub title: String,
  pub url: String,
  pub state: String,
  pub user: String,
  pub description: Option<String>,
}

/// Owner/name pair identifying the repository under analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
  pub owner: String,
  pub name: String,
}

impl RepoRef {
  pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      name: name.into(),
    }
  }

  pub fn slug(&self) -> String {
    format!("{}/{}", self.owner, self.name)
  }
}
