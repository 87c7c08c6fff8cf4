use test_support::{init_insta, tempdir};

use crate::end_to_end::run_fixture_pipeline;

fn fixture_report() -> serde_json::Value {
  init_insta();
  let td = tempdir();
  let (_, path) = run_fixture_pipeline(td.path(), &td.path().join("reports"));
  serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap()
}

#[test]
fn milestone_analysis_snapshot() {
  let v = fixture_report();

  insta::with_settings!({ sort_maps => true }, {
    insta::assert_json_snapshot!(v["llm_milestone_analysis"], @r###"
    {
      "actionable_improvements": [
        "Link a PR for #5",
        "Add integration tests",
        "Close out release notes"
      ],
      "justification": "Checkout is close; release notes have no PR.",
      "release_confidence_score": 64
    }
    "###);
  });
}

#[test]
fn commit_analysis_snapshot_with_redacted_diff() {
  let v = fixture_report();

  insta::with_settings!({ sort_maps => true }, {
    insta::assert_json_snapshot!(v["issues"]["3"]["associated_prs"]["12"]["commits"][1], {
      ".diff" => "[diff]"
    }, @r###"
    {
      "author": "Dev One",
      "date": "2025-08-13T09:30:00Z",
      "diff": "[diff]",
      "llm_analysis": {
        "actionable_improvements": [
          "Add unit tests for checkout"
        ],
        "confidence_score": 78,
        "justification": "The change is focused but lacks tests."
      },
      "message": "fix: round totals",
      "sha": "b2c3d4e5f60718293a4b5c6d7e8f901234567890"
    }
    "###);
  });
}
