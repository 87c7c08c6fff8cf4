use release_readiness::forge::{build_api, ForgeApi};
use release_readiness::model::RepoRef;
use serial_test::serial;
use test_support::{fixture_path, with_env};

fn fixture_api() -> Box<dyn ForgeApi> {
  let path = fixture_path("forge/sprint1.json");
  let _env = with_env(&[("RR_TEST_FORGE_FIXTURE", path.to_str().unwrap())]);
  build_api("unused", RepoRef::new("acme", "widgets"), "http://127.0.0.1:9").unwrap()
}

#[test]
#[serial]
fn env_selects_the_fixture_backend() {
  let api = fixture_api();

  let m = api.find_open_milestone("Sprint-1").unwrap().expect("open milestone");
  assert_eq!(m.number, 1);
  assert!(api.find_open_milestone("Sprint-0").unwrap().is_none(), "closed milestones are not returned");

  let issues = api.list_issues(&m).unwrap();
  assert_eq!(issues.len(), 4);
  assert!(issues.iter().any(|i| i.number == 14 && i.is_pull_request));
}

#[test]
#[serial]
fn fixture_search_keeps_only_pull_requests() {
  let api = fixture_api();

  let found: Vec<u64> = api
    .search_pull_requests_mentioning(4)
    .unwrap()
    .into_iter()
    .map(|p| p.number)
    .collect();
  assert_eq!(found, vec![14]);
  assert!(api.list_pr_commits(14).is_err());
}

#[test]
#[serial]
fn fixture_commits_carry_assembled_diffs() {
  let api = fixture_api();

  let commits = api.list_pr_commits(12).unwrap();
  assert_eq!(commits.len(), 2);
  assert_eq!(commits[1].subject(), "fix: round totals");
  assert!(commits[1].diff.contains("+let t = (a + b).round();"));
}
