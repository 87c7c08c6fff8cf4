// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Fixed prompt templates (commit, pull request, milestone) and slot rendering
// role: analysis/prompts
// inputs: Tier plus named slot values
// outputs: Fully rendered prompt text with no slot markers left
// invariants:
// - Every `{slot}` in a template is filled exactly once; inserted values are never re-scanned
// - Each template states the output contract the parser reads (score label, Justification, Actionable Improvements)
// - TEMPLATE_VERSION changes whenever a template's output contract changes
// errors: Missing or unknown slot values are configuration errors
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::model::Tier;

/// Bumped together with the parser rules in `analysis::parser`.
pub const TEMPLATE_VERSION: u32 = 2;

pub const COMMIT_TEMPLATE: &str = r#"**Role:** You are an expert software engineer and a meticulous code reviewer. Your task is to evaluate a single Git commit based on its quality, completeness, and implied test coverage.

**Input Commit Details:**
* **Commit Message:**
    ```
    {commit_message}
    ```
* **Code Changes (Diff):**
    ```
    {commit_diff}
    ```
* **Relevant Review Comments (if any):**
    ```
    {review_comments}
    ```

**Task:**
1.  **Analyze the code changes:** assess readability, adherence to the conventions of the language in use, error handling, resource management, potential for bugs, and complexity. Determine whether the changes address the intent stated in the commit message and whether the commit is atomic.
2.  **Consider review comments:** how do they influence your assessment? Are there unresolved concerns?
3.  **Provide a Confidence Score** between 0 and 100, where 0 is very low confidence (significant issues) and 100 is very high confidence (flawless, well-tested).
4.  **Justify the Score:** briefly explain the reasoning, highlighting strengths and weaknesses.
5.  **Suggest Improvements (if score < 90):** concrete actions to improve the commit's quality or associated testing.

**Output Format:**
```markdown
Confidence Score: [0-100]
Justification: [Brief explanation of the score, referencing code quality, completeness, test implications, and review comments.]
Actionable Improvements:
- [Improvement 1]
- [Improvement 2]
- ... (Only if score is < 90, each improvement on a new line prefixed with '- ')
```
"#;

pub const PULL_REQUEST_TEMPLATE: &str = r#"**Role:** You are a senior engineer acting as release gatekeeper. Your task is to judge whether a pull request is ready to ship, using its description, its commits (each already scored individually), and the review discussion.

**Pull Request:**
* **Title:** {pr_title}
* **Description:**
    ```
    {pr_description}
    ```
* **Commits (with individual confidence scores):**
    ```
    {commit_summaries}
    ```
* **Reviews and Discussion:**
    ```
    {discussion}
    ```

**Task:**
1.  Weigh the commit-level scores, paying most attention to low-scoring commits.
2.  Check whether reviewer concerns were addressed and whether the change appears complete and tested.
3.  **Provide a Release Readiness Score** between 0 and 100, where 0 means it must not ship and 100 means ready to merge as-is.
4.  **Justify the Score** in a short paragraph.
5.  **Suggest Improvements (if score < 90):** concrete actions that would raise readiness.

**Output Format:**
```markdown
Release Readiness Score: [0-100]
Justification: [Short paragraph explaining the score.]
Actionable Improvements:
- [Improvement 1]
- [Improvement 2]
- ... (Only if score is < 90, each improvement on a new line prefixed with '- ')
```
"#;

pub const MILESTONE_TEMPLATE: &str = r#"**Role:** You are an engineering manager preparing a release decision. Your task is to assess overall release confidence for a milestone from its issues, their linked pull requests, and the scores already assigned to those pull requests and their commits.

**Milestone:** {milestone_title}

**Issues, Pull Requests, and Prior Analyses:**
```
{milestone_summary}
```

**Task:**
1.  Identify issues without linked pull requests and pull requests with low readiness scores.
2.  Judge the overall risk of releasing the milestone now.
3.  **Provide a Release Confidence Score** between 0 and 100, where 0 means the release must not go ahead and 100 means full confidence.
4.  **Justify the Score** in a short paragraph naming the main risks.
5.  **List Actionable Improvements** that would most increase release confidence.

**Output Format:**
```markdown
Release Confidence Score: [0-100]
Justification: [Short paragraph explaining the score and main risks.]
Actionable Improvements:
- [Improvement 1]
- [Improvement 2]
- ... (each improvement on a new line prefixed with '- ')
```
"#;

static RE_SLOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("slot regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
  #[error("{tier} template: no value for slot `{slot}`")]
  MissingSlot { tier: Tier, slot: String },

  #[error("{tier} template has no slot `{slot}`")]
  UnknownSlot { tier: Tier, slot: String },
}

/// One template of the bank.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
  pub tier: Tier,
  pub text: &'static str,
}

impl PromptTemplate {
  pub fn for_tier(tier: Tier) -> Self {
    let text = match tier {
      Tier::Commit => COMMIT_TEMPLATE,
      Tier::PullRequest => PULL_REQUEST_TEMPLATE,
      Tier::Milestone => MILESTONE_TEMPLATE,
    };
    Self { tier, text }
  }

  /// Slot names in order of first appearance.
  pub fn slots(&self) -> Vec<&'static str> {
    let mut seen = BTreeSet::new();
    RE_SLOT
      .captures_iter(self.text)
      .filter_map(|c| c.get(1).map(|m| m.as_str()))
      .filter(|name| seen.insert(*name))
      .collect()
  }

  /// Substitute every slot. Values are inserted verbatim.
  pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
    let slots = self.slots();

    for (name, _) in values {
      if !slots.iter().any(|s| s == name) {
        return Err(TemplateError::UnknownSlot {
          tier: self.tier,
          slot: name.to_string(),
        });
      }
    }

    let lookup: HashMap<&str, &str> = values.iter().copied().collect();

    if let Some(missing) = slots.iter().find(|s| !lookup.contains_key(**s)) {
      return Err(TemplateError::MissingSlot {
        tier: self.tier,
        slot: missing.to_string(),
      });
    }

    let rendered = RE_SLOT.replace_all(self.text, |caps: &Captures| {
      let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
      lookup.get(name).copied().unwrap_or_default().to_string()
    });

    Ok(rendered.into_owned())
  }
}

/// Render the template for `tier`.
pub fn render(tier: Tier, values: &[(&str, &str)]) -> Result<String, TemplateError> {
  PromptTemplate::for_tier(tier).render(values)
}
