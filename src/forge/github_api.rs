// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: GitHub REST v3 access for milestone aggregation (milestones, issues, PRs, commits, reviews, comments)
// role: forge/github-api
// inputs: RepoRef; token from GITHUB_TOKEN / GH_TOKEN / `gh auth token`; optional API base URL; env RR_TEST_FORGE_FIXTURE
// outputs: Typed summaries and records from crate::model
// side_effects: Network calls to the GitHub API; spawns `gh` subprocess for token discovery; reads fixture files
// invariants:
// - List endpoints request per_page=100 and follow `Link: <..>; rel="next"` until exhausted
// - get_pull_request maps HTTP 404 to Ok(None)
// - Commit diffs are assembled from the commit's file patches; the sentinel text stands in when none are available
// - Search hits that are not pull requests are dropped; each hit is fetched in full, and a failed hit is skipped without failing the search
// errors: anyhow::Error with request context; callers decide whether an item degrades or the run aborts
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ext::serde_json::JsonFetch;
use crate::model::{
  CommentRecord, CommitRecord, IssueSummary, MilestoneHandle, PullRequestSummary, RepoRef, ReviewRecord,
  NO_DIFF_AVAILABLE,
};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Env var naming a JSON fixture document; when set, the fixture backend replaces HTTP.
pub const FORGE_FIXTURE_ENV: &str = "RR_TEST_FORGE_FIXTURE";

const USER_AGENT: &str = concat!("release-readiness/", env!("CARGO_PKG_VERSION"));

static RE_LINK_NEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).unwrap());

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn get_github_token() -> Option<String> {
  for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(var) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

/// URL of the next page from a `Link` response header.
pub fn next_page_url(link_header: Option<&str>) -> Option<String> {
  let header = link_header?;

  header
    .split(',')
    .find_map(|part| RE_LINK_NEXT.captures(part))
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().to_string())
}

/// Web host serving PR pages for an API base: `https://api.github.com` → `github.com`,
/// `https://ghe.example.com/api/v3` → `ghe.example.com`, `https://api.ghe.example.com` → `ghe.example.com`.
pub fn web_host_for_api(api_base: &str) -> String {
  let rest = api_base
    .trim()
    .trim_start_matches("https://")
    .trim_start_matches("http://");
  let host = rest.split('/').next().unwrap_or_default().to_ascii_lowercase();

  match host.strip_prefix("api.") {
    Some(web) if !web.is_empty() => web.to_string(),
    _ => host,
  }
}

// --- Trait seam for the forge ---
pub trait ForgeApi {
  fn repository(&self) -> &RepoRef;
  /// Host that PR links in comments point at, e.g. `github.com`.
  fn web_host(&self) -> &str;
  fn find_open_milestone(&self, title: &str) -> Result<Option<MilestoneHandle>>;
  fn list_issues(&self, milestone: &MilestoneHandle) -> Result<Vec<IssueSummary>>;
  fn list_issue_comments(&self, issue: u64) -> Result<Vec<CommentRecord>>;
  fn get_pull_request(&self, number: u64) -> Result<Option<PullRequestSummary>>;
  fn search_pull_requests_mentioning(&self, issue: u64) -> Result<Vec<PullRequestSummary>>;
  fn list_pr_commits(&self, pr: u64) -> Result<Vec<CommitRecord>>;
  fn list_pr_reviews(&self, pr: u64) -> Result<Vec<ReviewRecord>>;
  fn list_pr_comments(&self, pr: u64) -> Result<Vec<CommentRecord>>;
}

// --- JSON → model mapping shared by every backend ---

fn login(v: &Value) -> String {
  v.fetch("user.login").to::<String>().unwrap_or_else(|| "ghost".into())
}

pub(crate) fn milestone_from_json(v: &Value) -> Option<MilestoneHandle> {
  Some(MilestoneHandle {
    number: v.fetch("number").to()?,
    title: v.fetch("title").to_or_default(),
  })
}

pub(crate) fn issue_from_json(v: &Value) -> Option<IssueSummary> {
  Some(IssueSummary {
    number: v.fetch("number").to()?,
    title: v.fetch("title").to_or_default(),
    url: v.fetch("html_url").to_or_default(),
    state: v.fetch("state").to_or_default(),
    is_pull_request: v.fetch("pull_request").is_present(),
  })
}

pub(crate) fn comment_from_json(v: &Value) -> CommentRecord {
  CommentRecord {
    user: login(v),
    body: v.fetch("body").to_or_default(),
  }
}

pub(crate) fn review_from_json(v: &Value) -> ReviewRecord {
  ReviewRecord {
    user: login(v),
    state: v.fetch("state").to(),
    body: v.fetch("body").to_or_default(),
  }
}

pub(crate) fn pull_from_json(v: &Value) -> Option<PullRequestSummary> {
  Some(PullRequestSummary {
    number: v.fetch("number").to()?,
    title: v.fetch("title").to_or_default(),
    url: v.fetch("html_url").to_or_default(),
    state: v.fetch("state").to_or_default(),
    user: login(v),
    description: v.fetch("body").to(),
  })
}

/// Unified diff text from a commit detail payload (`files[].patch`).
pub(crate) fn diff_from_files(detail: &Value) -> String {
  let mut out = String::new();

  for f in detail.fetch("files").items() {
    let Some(patch) = f.fetch("patch").to::<String>() else {
      continue;
    };
    let name: String = f.fetch("filename").to_or_default();
    let previous = f.fetch("previous_filename").to::<String>().unwrap_or_else(|| name.clone());

    out.push_str(&format!("--- a/{}\n+++ b/{}\n", previous, name));
    out.push_str(&patch);

    if !patch.ends_with('\n') {
      out.push('\n');
    }
  }

  if out.is_empty() {
    NO_DIFF_AVAILABLE.to_string()
  } else {
    out
  }
}

pub(crate) fn commit_from_json(item: &Value, detail: Option<&Value>) -> Option<CommitRecord> {
  let sha: String = item.fetch("sha").to()?;

  let author = item
    .fetch("commit.author.name")
    .to::<String>()
    .or_else(|| item.fetch("author.login").to())
    .unwrap_or_default();

  Some(CommitRecord {
    sha,
    message: item.fetch("commit.message").to_or_default(),
    author,
    date: item.fetch("commit.author.date").to_or_default(),
    diff: detail.map(diff_from_files).unwrap_or_else(|| NO_DIFF_AVAILABLE.to_string()),
    analysis: None,
  })
}

// --- HTTP backend ---

pub struct GithubHttpApi {
  token: String,
  repo: RepoRef,
  api_base: String,
  web_host: String,
  agent: ureq::Agent,
}

impl GithubHttpApi {
  pub fn new(token: String, repo: RepoRef, api_base: &str) -> Self {
    let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(60)).build();

    Self {
      token,
      repo,
      api_base: api_base.trim_end_matches('/').to_string(),
      web_host: web_host_for_api(api_base),
      agent,
    }
  }

  fn repo_url(&self, tail: &str) -> String {
    format!("{}/repos/{}/{}/{}", self.api_base, self.repo.owner, self.repo.name, tail)
  }

  fn request(&self, url: &str) -> std::result::Result<ureq::Response, ureq::Error> {
    self
      .agent
      .get(url)
      .set("Accept", "application/vnd.github+json")
      .set("User-Agent", USER_AGENT)
      .set("X-GitHub-Api-Version", "2022-11-28")
      .set("Authorization", &format!("Bearer {}", self.token))
      .call()
  }

  /// GET a JSON document; 404 yields None.
  fn get_json_opt(&self, url: &str) -> Result<Option<Value>> {
    match self.request(url) {
      Ok(resp) => {
        let v = resp.into_json::<Value>().with_context(|| format!("decoding {}", url))?;
        Ok(Some(v))
      }
      Err(ureq::Error::Status(404, _)) => Ok(None),
      Err(e) => Err(http_error(url, e)),
    }
  }

  fn get_json(&self, url: &str) -> Result<Value> {
    self.get_json_opt(url)?.ok_or_else(|| anyhow!("GET {}: not found", url))
  }

  /// GET every page of a list endpoint. `items_key` selects the array inside
  /// object-shaped pages (search results); top-level arrays are used otherwise.
  fn get_paged(&self, first_url: &str, items_key: Option<&str>) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    let mut next = Some(with_per_page(first_url));

    while let Some(url) = next.take() {
      let resp = self.request(&url).map_err(|e| http_error(&url, e))?;
      next = next_page_url(resp.header("link"));

      let page = resp.into_json::<Value>().with_context(|| format!("decoding {}", url))?;
      let items = match items_key {
        Some(key) => page.fetch(key).items(),
        None => page.fetch("").items(),
      };

      out.extend(items.iter().cloned());
    }

    Ok(out)
  }
}

fn with_per_page(url: &str) -> String {
  if url.contains("per_page=") {
    url.to_string()
  } else if url.contains('?') {
    format!("{}&per_page=100", url)
  } else {
    format!("{}?per_page=100", url)
  }
}

fn http_error(url: &str, err: ureq::Error) -> anyhow::Error {
  match err {
    ureq::Error::Status(code, resp) => {
      let body = resp.into_string().unwrap_or_default();
      let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.fetch("message").to::<String>())
        .unwrap_or(body);
      anyhow!("GET {} failed with HTTP {}: {}", url, code, crate::util::snippet(&message, 200))
    }
    ureq::Error::Transport(t) => anyhow!("GET {} failed: {}", url, t),
  }
}

/// Search query text, URL-encoded: `type:pr repo:<owner>/<name> #<issue>`.
pub fn search_query(repo: &RepoRef, issue: u64) -> String {
  format!("type:pr repo:{} #{}", repo.slug(), issue)
    .replace('#', "%23")
    .replace(' ', "+")
}

impl ForgeApi for GithubHttpApi {
  fn repository(&self) -> &RepoRef {
    &self.repo
  }

  fn web_host(&self) -> &str {
    &self.web_host
  }

  fn find_open_milestone(&self, title: &str) -> Result<Option<MilestoneHandle>> {
    let all = self.get_paged(&self.repo_url("milestones?state=open"), None)?;

    Ok(all.iter().filter_map(milestone_from_json).find(|m| m.title == title))
  }

  fn list_issues(&self, milestone: &MilestoneHandle) -> Result<Vec<IssueSummary>> {
    let url = self.repo_url(&format!("issues?milestone={}&state=all", milestone.number));

    Ok(self.get_paged(&url, None)?.iter().filter_map(issue_from_json).collect())
  }

  fn list_issue_comments(&self, issue: u64) -> Result<Vec<CommentRecord>> {
    let url = self.repo_url(&format!("issues/{}/comments", issue));

    Ok(self.get_paged(&url, None)?.iter().map(comment_from_json).collect())
  }

  fn get_pull_request(&self, number: u64) -> Result<Option<PullRequestSummary>> {
    let v = self.get_json_opt(&self.repo_url(&format!("pulls/{}", number)))?;

    Ok(v.as_ref().and_then(pull_from_json))
  }

  fn search_pull_requests_mentioning(&self, issue: u64) -> Result<Vec<PullRequestSummary>> {
    let url = format!("{}/search/issues?q={}", self.api_base, search_query(&self.repo, issue));
    let hits = self.get_paged(&url, Some("items"))?;

    let mut out = Vec::new();

    for hit in hits.iter().filter(|h| h.fetch("pull_request").is_present()) {
      let Some(number) = hit.fetch("number").to::<u64>() else {
        continue;
      };

      match self.get_pull_request(number) {
        Ok(Some(pr)) => out.push(pr),
        Ok(None) => tracing::warn!(issue, pr = number, "search hit pull request not found"),
        Err(e) => tracing::warn!(issue, pr = number, error = %format!("{e:#}"), "failed to fetch search hit; skipping"),
      }
    }

    Ok(out)
  }

  fn list_pr_commits(&self, pr: u64) -> Result<Vec<CommitRecord>> {
    let items = self.get_paged(&self.repo_url(&format!("pulls/{}/commits", pr)), None)?;
    let mut out = Vec::with_capacity(items.len());

    for item in &items {
      let Some(sha) = item.fetch("sha").to::<String>() else {
        continue;
      };

      // Commit listings carry no patches; the detail endpoint does.
      let detail = match self.get_json(&self.repo_url(&format!("commits/{}", sha))) {
        Ok(d) => Some(d),
        Err(e) => {
          tracing::warn!(pr, sha = %sha, error = %format!("{e:#}"), "commit detail unavailable; using placeholder diff");
          None
        }
      };

      out.extend(commit_from_json(item, detail.as_ref()));
    }

    Ok(out)
  }

  fn list_pr_reviews(&self, pr: u64) -> Result<Vec<ReviewRecord>> {
    let url = self.repo_url(&format!("pulls/{}/reviews", pr));

    Ok(self.get_paged(&url, None)?.iter().map(review_from_json).collect())
  }

  fn list_pr_comments(&self, pr: u64) -> Result<Vec<CommentRecord>> {
    // General conversation comments live on the issue side of a PR.
    self.list_issue_comments(pr)
  }
}

// --- Fixture backend ---

/// Serves GitHub-shaped JSON from a single fixture document.
///
/// Keys: `milestones` (array), `issues` (array), and maps keyed by number or sha:
/// `issue_comments`, `pulls`, `search` (arrays of search hits), `pull_commits`,
/// `commit_details`, `pull_reviews`, `pull_comments`. A `fail` array of
/// `"<key>:<id>"` entries (or bare `"<key>"`) turns those lookups into errors.
/// An optional `web_host` string overrides the default `github.com`.
pub struct GithubFixtureApi {
  doc: Value,
  repo: RepoRef,
  web_host: String,
  source: PathBuf,
}

impl GithubFixtureApi {
  pub fn from_file(path: &Path, repo: RepoRef) -> Result<Self> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading forge fixture {}", path.display()))?;
    let doc = serde_json::from_str(&text).with_context(|| format!("parsing forge fixture {}", path.display()))?;

    Ok(Self::with_source(doc, repo, path.to_path_buf()))
  }

  pub fn from_value(doc: Value, repo: RepoRef) -> Self {
    Self::with_source(doc, repo, PathBuf::from("<inline>"))
  }

  fn with_source(doc: Value, repo: RepoRef, source: PathBuf) -> Self {
    let web_host = doc
      .fetch("web_host")
      .to::<String>()
      .unwrap_or_else(|| "github.com".into());

    Self {
      doc,
      repo,
      web_host,
      source,
    }
  }

  fn check(&self, key: &str, id: &str) -> Result<()> {
    let fails: Vec<String> = self.doc.fetch("fail").to_or_default();
    let scoped = format!("{}:{}", key, id);

    if fails.iter().any(|f| f == key || *f == scoped) {
      return Err(anyhow!("fixture failure for {} ({})", scoped, self.source.display()));
    }

    Ok(())
  }

  fn entry(&self, key: &str, id: &str) -> Result<Option<&Value>> {
    self.check(key, id)?;

    Ok(self.doc.get(key).and_then(|m| m.get(id)).filter(|v| !v.is_null()))
  }

  fn list(&self, key: &str, id: &str) -> Result<&[Value]> {
    Ok(self.entry(key, id)?.and_then(|v| v.as_array()).map(Vec::as_slice).unwrap_or(&[]))
  }
}

impl ForgeApi for GithubFixtureApi {
  fn repository(&self) -> &RepoRef {
    &self.repo
  }

  fn web_host(&self) -> &str {
    &self.web_host
  }

  fn find_open_milestone(&self, title: &str) -> Result<Option<MilestoneHandle>> {
    self.check("milestones", title)?;

    Ok(
      self
        .doc
        .fetch("milestones")
        .items()
        .iter()
        .filter(|m| m.fetch("state").to::<String>().map_or(true, |s| s == "open"))
        .filter_map(milestone_from_json)
        .find(|m| m.title == title),
    )
  }

  fn list_issues(&self, milestone: &MilestoneHandle) -> Result<Vec<IssueSummary>> {
    self.check("issues", &milestone.number.to_string())?;

    Ok(self.doc.fetch("issues").items().iter().filter_map(issue_from_json).collect())
  }

  fn list_issue_comments(&self, issue: u64) -> Result<Vec<CommentRecord>> {
    Ok(self.list("issue_comments", &issue.to_string())?.iter().map(comment_from_json).collect())
  }

  fn get_pull_request(&self, number: u64) -> Result<Option<PullRequestSummary>> {
    Ok(self.entry("pulls", &number.to_string())?.and_then(pull_from_json))
  }

  fn search_pull_requests_mentioning(&self, issue: u64) -> Result<Vec<PullRequestSummary>> {
    let hits = self.list("search", &issue.to_string())?;
    let mut out = Vec::new();

    for hit in hits.iter().filter(|h| h.fetch("pull_request").is_present()) {
      let Some(number) = hit.fetch("number").to::<u64>() else {
        continue;
      };

      match self.get_pull_request(number) {
        Ok(Some(pr)) => out.push(pr),
        Ok(None) => tracing::warn!(issue, pr = number, "search hit pull request not found"),
        Err(e) => tracing::warn!(issue, pr = number, error = %format!("{e:#}"), "failed to fetch search hit; skipping"),
      }
    }

    Ok(out)
  }

  fn list_pr_commits(&self, pr: u64) -> Result<Vec<CommitRecord>> {
    let items = self.list("pull_commits", &pr.to_string())?;
    let mut out = Vec::with_capacity(items.len());

    for item in items {
      let sha: String = item.fetch("sha").to_or_default();
      let detail = match self.entry("commit_details", &sha) {
        Ok(d) => d,
        Err(e) => {
          tracing::warn!(pr, sha = %sha, error = %format!("{e:#}"), "commit detail unavailable; using placeholder diff");
          None
        }
      };

      out.extend(commit_from_json(item, detail));
    }

    Ok(out)
  }

  fn list_pr_reviews(&self, pr: u64) -> Result<Vec<ReviewRecord>> {
    Ok(self.list("pull_reviews", &pr.to_string())?.iter().map(review_from_json).collect())
  }

  fn list_pr_comments(&self, pr: u64) -> Result<Vec<CommentRecord>> {
    Ok(self.list("pull_comments", &pr.to_string())?.iter().map(comment_from_json).collect())
  }
}

pub fn env_wants_fixture() -> Option<PathBuf> {
  std::env::var(FORGE_FIXTURE_ENV)
    .ok()
    .filter(|s| !s.trim().is_empty())
    .map(PathBuf::from)
}

/// Select the forge backend: fixture when requested through the environment, HTTP otherwise.
pub fn build_api(token: &str, repo: RepoRef, api_base: &str) -> Result<Box<dyn ForgeApi>> {
  if let Some(path) = env_wants_fixture() {
    tracing::info!(fixture = %path.display(), "using forge fixture");
    return Ok(Box::new(GithubFixtureApi::from_file(&path, repo)?));
  }

  tracing::info!(repo = %repo.slug(), api = %api_base, "connecting to GitHub");

  Ok(Box::new(GithubHttpApi::new(token.to_string(), repo, api_base)))
}
