use std::path::{Path, PathBuf};

use predicates::prelude::*;
use test_support::{fixture_path, hermetic_cmd, tempdir};

pub const REPORT_NAME: &str = "milestone_Sprint-1_analysis_20250815_120000.json";

/// Command wired to the canned forge and model fixtures.
pub fn fixture_cmd(cwd: &Path) -> assert_cmd::Command {
  let mut cmd = hermetic_cmd("release-readiness", cwd);
  cmd
    .env("GITHUB_TOKEN", "test-token")
    .env("GITHUB_REPO_OWNER", "acme")
    .env("GITHUB_REPO_NAME", "widgets")
    .env("GOOGLE_API_KEY", "test-key")
    .env("RR_TEST_FORGE_FIXTURE", fixture_path("forge/sprint1.json"))
    .env("RR_TEST_LLM_FIXTURE", fixture_path("llm/answers.json"))
    .args(["--now-override", "2025-08-15T12:00:00"]);
  cmd
}

/// Run the fixture pipeline into `out` and return (stdout, report path).
pub fn run_fixture_pipeline(cwd: &Path, out: &Path) -> (String, PathBuf) {
  let output = fixture_cmd(cwd).arg("--out-dir").arg(out).output().unwrap();
  assert!(
    output.status.success(),
    "run failed: {}",
    String::from_utf8_lossy(&output.stderr)
  );

  (String::from_utf8(output.stdout).unwrap(), out.join(REPORT_NAME))
}

#[test]
fn run_writes_json_and_prints_console_report() {
  let td = tempdir();
  let out_dir = td.path().join("reports");
  let (stdout, path) = run_fixture_pipeline(td.path(), &out_dir);

  assert!(path.exists(), "expected {}", path.display());
  assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);

  let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
  assert_eq!(v["milestone_title"], "Sprint-1");

  // PR listed among the milestone issues is skipped; the three real issues remain
  let issue_keys: Vec<&str> = v["issues"].as_object().unwrap().keys().map(|k| k.as_str()).collect();
  assert_eq!(issue_keys, vec!["3", "4", "5"]);

  // Issue 3: the same-repo comment link and the search hit both name PR 12; the foreign link is ignored
  let prs3 = v["issues"]["3"]["associated_prs"].as_object().unwrap();
  assert_eq!(prs3.keys().collect::<Vec<_>>(), vec!["12"]);

  let pr12 = &v["issues"]["3"]["associated_prs"]["12"];
  assert_eq!(pr12["reviews"].as_array().unwrap().len(), 2, "duplicate review recorded once");
  assert_eq!(pr12["comments"][0]["user"], "ci-bot");
  assert_eq!(pr12["llm_pr_analysis"]["release_readiness_score"], 72);
  assert_eq!(pr12["llm_pr_analysis"]["actionable_improvements"][0], "Add integration tests");

  let c0 = &pr12["commits"][0];
  assert_eq!(c0["author"], "Dev One");
  assert!(c0["diff"].as_str().unwrap().starts_with("--- a/src/checkout.rs\n+++ b/src/checkout.rs\n@@"));
  assert_eq!(c0["llm_analysis"]["confidence_score"], 78);
  assert_eq!(c0["llm_analysis"]["justification"], "The change is focused but lacks tests.");

  // Issue 4: commit listing fails for PR 14; the PR is still analyzed with no commits
  let pr14 = &v["issues"]["4"]["associated_prs"]["14"];
  assert_eq!(pr14["commits"].as_array().unwrap().len(), 0);
  assert_eq!(pr14["description"], serde_json::Value::Null);
  assert_eq!(pr14["llm_pr_analysis"]["release_readiness_score"], 72);

  // Issue 5 has no PRs
  assert!(v["issues"]["5"]["associated_prs"].as_object().unwrap().is_empty());

  let m = &v["llm_milestone_analysis"];
  assert_eq!(m["release_confidence_score"], 64);
  assert_eq!(m["justification"], "Checkout is close; release notes have no PR.");
  assert_eq!(
    m["actionable_improvements"],
    serde_json::json!(["Link a PR for #5", "Add integration tests", "Close out release notes"])
  );

  assert!(stdout.starts_with("--- Release Readiness Report for Milestone: Sprint-1 ---\n"));
  assert!(stdout.contains("   Release Confidence Score: 64/100"));
  assert!(stdout.contains("## Issue #4: Receipt emails\n   Status: Closed"));
  assert!(stdout.contains("     Commit: a1b2c3d - feat: checkout endpoint"));
  assert!(stdout.contains("     Description: No description provided."));
  assert!(stdout.contains("## Issue #5: Release notes"));
  assert!(stdout.contains("   No associated Pull Requests."));
  assert!(stdout.trim_end().ends_with("--- End of Report ---"));
}

#[test]
fn saved_report_re_renders_identically() {
  let td = tempdir();
  let (stdout, path) = run_fixture_pipeline(td.path(), &td.path().join("reports"));

  let rendered = hermetic_cmd("release-readiness", td.path())
    .arg("--from-report")
    .arg(&path)
    .output()
    .unwrap();

  assert!(rendered.status.success());
  assert_eq!(String::from_utf8(rendered.stdout).unwrap(), stdout);
}

#[test]
fn missing_milestone_exits_cleanly_without_a_file() {
  let td = tempdir();
  let out_dir = td.path().join("reports");

  fixture_cmd(td.path())
    .args(["--milestone", "Sprint-0"])
    .arg("--out-dir")
    .arg(&out_dir)
    .assert()
    .success()
    .stdout(predicate::str::contains(
      "No report generated: milestone 'Sprint-0' was not found, is closed, or has no issues.",
    ));

  assert!(!out_dir.exists());
}

#[test]
fn model_failures_degrade_to_zero_scores() {
  let td = tempdir();
  let answers = td.path().join("failing.json");
  std::fs::write(&answers, r#"{"fail": ["commit", "pull_request", "milestone"]}"#).unwrap();

  let out_dir = td.path().join("reports");
  let output = fixture_cmd(td.path())
    .env("RR_TEST_LLM_FIXTURE", &answers)
    .arg("--out-dir")
    .arg(&out_dir)
    .output()
    .unwrap();
  assert!(output.status.success());

  let v: serde_json::Value = serde_json::from_slice(&std::fs::read(out_dir.join(REPORT_NAME)).unwrap()).unwrap();
  assert_eq!(v["llm_milestone_analysis"]["release_confidence_score"], 0);
  assert!(v["llm_milestone_analysis"]["justification"]
    .as_str()
    .unwrap()
    .starts_with("Model call failed:"));
  assert_eq!(
    v["issues"]["3"]["associated_prs"]["12"]["commits"][1]["llm_analysis"]["confidence_score"],
    0
  );
}
