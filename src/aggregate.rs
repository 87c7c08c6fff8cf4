// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Drive forge retrieval and the tier analyzers bottom-up into one MilestoneReport
// role: orchestration/aggregate
// inputs: &dyn ForgeApi, Analyzer, milestone title
// outputs: Some(MilestoneReport) with every analysis filled, or None when there is nothing to report
// invariants:
// - Per issue: comment URLs (same repository on the forge's web host, every match) then search hits, deduplicated by PR number
// - A PR reached from several issues is retrieved and analyzed once; later issues get a copy of the analyzed record
// - Order of work: commits → PR → (after all issues) milestone
// - Issues-list entries that are pull requests are skipped
// errors: Milestone lookup and issue listing failures abort the run; per-item failures degrade to empty lists or a skipped PR
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashMap;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::analyzers::{review_text, Analyzer};
use crate::forge::ForgeApi;
use crate::model::{IssueRecord, IssueSummary, MilestoneReport, PullRequestRecord, PullRequestSummary, RepoRef};

static RE_PR_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"https?://([A-Za-z0-9.-]+(?::\d+)?)/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/pull/(\d+)").unwrap()
});

/// PR numbers linked from `text` that belong to `repo` on `web_host`, in order of first appearance.
pub fn pr_numbers_in_text(text: &str, repo: &RepoRef, web_host: &str) -> Vec<u64> {
  let mut out: Vec<u64> = Vec::new();

  for caps in RE_PR_URL.captures_iter(text) {
    let same_repo = caps[1].eq_ignore_ascii_case(web_host)
      && caps[2].eq_ignore_ascii_case(&repo.owner)
      && caps[3].eq_ignore_ascii_case(&repo.name);

    if !same_repo {
      continue;
    }

    if let Ok(n) = caps[4].parse::<u64>() {
      if !out.contains(&n) {
        out.push(n);
      }
    }
  }

  out
}

fn or_empty<T>(res: Result<Vec<T>>, what: &str) -> Vec<T> {
  match res {
    Ok(v) => v,
    Err(e) => {
      tracing::warn!(error = %format!("{e:#}"), "failed to fetch {}; continuing without it", what);
      Vec::new()
    }
  }
}

pub struct Aggregator<'a> {
  forge: &'a dyn ForgeApi,
  analyzer: Analyzer<'a>,
}

impl<'a> Aggregator<'a> {
  pub fn new(forge: &'a dyn ForgeApi, analyzer: Analyzer<'a>) -> Self {
    Self { forge, analyzer }
  }

  /// Build and analyze the report for the open milestone titled `title`.
  pub fn run(&self, title: &str) -> Result<Option<MilestoneReport>> {
    let repo = self.forge.repository().slug();

    // Phase 1: locate the milestone and its issues; failures here abort the run
    let Some(milestone) = self
      .forge
      .find_open_milestone(title)
      .with_context(|| format!("looking up milestone '{}' in {}", title, repo))?
    else {
      tracing::warn!(milestone = %title, repo = %repo, "milestone not found or is closed");
      return Ok(None);
    };

    let issues: Vec<IssueSummary> = self
      .forge
      .list_issues(&milestone)
      .with_context(|| format!("listing issues for milestone '{}'", milestone.title))?
      .into_iter()
      .filter(|i| {
        if i.is_pull_request {
          tracing::debug!(number = i.number, "skipping pull request listed as milestone issue");
        }
        !i.is_pull_request
      })
      .collect();

    if issues.is_empty() {
      tracing::warn!(milestone = %milestone.title, "no issues found for milestone");
      return Ok(None);
    }

    tracing::info!(milestone = %milestone.title, issues = issues.len(), "processing milestone");

    // Phase 2: per-issue retrieval with commit and PR analysis
    let mut report = MilestoneReport::new(&milestone.title);
    let mut processed: HashMap<u64, PullRequestRecord> = HashMap::new();

    for summary in &issues {
      let issue = self.collect_issue(summary, &mut processed)?;
      report.issues.insert(issue.number, issue);
    }

    // Phase 3: milestone analysis over the complete tree
    self.analyzer.analyze_milestone(&mut report)?;

    Ok(Some(report))
  }

  fn collect_issue(&self, summary: &IssueSummary, processed: &mut HashMap<u64, PullRequestRecord>) -> Result<IssueRecord> {
    tracing::info!(issue = summary.number, title = %summary.title, "processing issue");

    let mut issue = IssueRecord::from_summary(summary);
    issue.comments = or_empty(
      self.forge.list_issue_comments(issue.number),
      &format!("comments for issue #{}", issue.number),
    );

    let mut order: Vec<u64> = Vec::new();
    let mut fetched: HashMap<u64, PullRequestSummary> = HashMap::new();

    // (a) PR links in the issue's comments
    let linked: Vec<u64> = issue
      .comments
      .iter()
      .flat_map(|c| pr_numbers_in_text(&c.body, self.forge.repository(), self.forge.web_host()))
      .collect();

    for number in linked {
      if order.contains(&number) {
        continue;
      }

      if processed.contains_key(&number) {
        order.push(number);
        continue;
      }

      match self.forge.get_pull_request(number) {
        Ok(Some(pr)) => {
          fetched.insert(number, pr);
          order.push(number);
        }
        Ok(None) => tracing::warn!(issue = issue.number, pr = number, "linked pull request not found"),
        Err(e) => tracing::warn!(issue = issue.number, pr = number, error = %format!("{e:#}"), "failed to fetch linked pull request"),
      }
    }

    // (b) PRs whose text mentions the issue
    let found = or_empty(
      self.forge.search_pull_requests_mentioning(issue.number),
      &format!("pull requests mentioning issue #{}", issue.number),
    );

    for pr in found {
      if !order.contains(&pr.number) {
        order.push(pr.number);
        fetched.entry(pr.number).or_insert(pr);
      }
    }

    if order.is_empty() {
      tracing::info!(issue = issue.number, "no pull requests linked to issue");
    }

    for number in order {
      let record = match processed.get(&number) {
        Some(done) => {
          tracing::debug!(issue = issue.number, pr = number, "reusing analyzed pull request");
          done.clone()
        }
        None => {
          let Some(pr) = fetched.remove(&number) else {
            continue;
          };
          let record = self.collect_pull_request(pr)?;
          processed.insert(number, record.clone());
          record
        }
      };

      issue.associated_prs.insert(number, record);
    }

    Ok(issue)
  }

  fn collect_pull_request(&self, summary: PullRequestSummary) -> Result<PullRequestRecord> {
    let mut pr = PullRequestRecord::from_summary(summary);
    tracing::info!(pr = pr.number, title = %pr.title, "processing pull request");

    let commits = or_empty(self.forge.list_pr_commits(pr.number), &format!("commits for PR #{}", pr.number));
    let reviews = or_empty(self.forge.list_pr_reviews(pr.number), &format!("reviews for PR #{}", pr.number));
    pr.comments = or_empty(self.forge.list_pr_comments(pr.number), &format!("comments for PR #{}", pr.number));
    pr.add_reviews(reviews);

    let reviews_blob = review_text(&pr.reviews);

    for mut commit in commits {
      self.analyzer.analyze_commit(&mut commit, &reviews_blob)?;
      pr.commits.push(commit);
    }

    self.analyzer.analyze_pull_request(&mut pr)?;

    Ok(pr)
  }
}
