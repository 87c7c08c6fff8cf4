use predicates::prelude::*;
use test_support::{hermetic_cmd, tempdir};

#[test]
fn missing_settings_exit_with_code_2_and_name_every_variable() {
  let td = tempdir();

  hermetic_cmd("release-readiness", td.path())
    .assert()
    .code(2)
    .stderr(predicate::str::contains("Configuration Error:"))
    .stderr(predicate::str::contains("GITHUB_TOKEN"))
    .stderr(predicate::str::contains("GITHUB_REPO_OWNER"))
    .stderr(predicate::str::contains("GITHUB_REPO_NAME"))
    .stderr(predicate::str::contains("GOOGLE_API_KEY"))
    .stdout(predicate::str::is_empty());

  assert!(!td.path().join("reports").exists());
}

#[test]
fn dotenv_file_in_working_directory_supplies_settings() {
  let td = tempdir();
  std::fs::write(
    td.path().join(".env"),
    "GITHUB_TOKEN=t\nGITHUB_REPO_OWNER=acme\nGITHUB_REPO_NAME=widgets\n",
  )
  .unwrap();

  // Only the model key is left missing, so the error names it alone.
  hermetic_cmd("release-readiness", td.path())
    .assert()
    .code(2)
    .stderr(predicate::str::contains("GOOGLE_API_KEY must be set"))
    .stderr(predicate::str::contains("GITHUB_REPO_OWNER").not());
}

#[test]
fn invalid_now_override_is_a_configuration_error() {
  let td = tempdir();

  hermetic_cmd("release-readiness", td.path())
    .args(["--from-report", "r.json", "--now-override", "tomorrow"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("invalid value for --now-override"));
}

#[test]
fn unreadable_forge_fixture_fails_with_code_1() {
  let td = tempdir();

  hermetic_cmd("release-readiness", td.path())
    .env("GITHUB_TOKEN", "t")
    .env("GITHUB_REPO_OWNER", "acme")
    .env("GITHUB_REPO_NAME", "widgets")
    .env("GOOGLE_API_KEY", "k")
    .env("RR_TEST_FORGE_FIXTURE", td.path().join("missing.json"))
    .assert()
    .code(1)
    .stderr(predicate::str::contains("An unexpected error occurred"));
}
