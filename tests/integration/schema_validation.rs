use jsonschema::validator_for;
use test_support::tempdir;

use crate::end_to_end::run_fixture_pipeline;

fn read_schema(name: &str) -> serde_json::Value {
  let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  let path = manifest_dir.join("tests").join("schemas").join(name);
  let data = std::fs::read(&path).expect("schema file");
  serde_json::from_slice(&data).expect("valid schema JSON")
}

fn compile_schema(name: &str) -> jsonschema::Validator {
  let schema = read_schema(name);
  validator_for(&schema).expect("compile schema")
}

#[test]
fn report_json_conforms_to_schema() {
  let td = tempdir();
  let (_, path) = run_fixture_pipeline(td.path(), &td.path().join("reports"));
  let report: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();

  let compiled = compile_schema("milestone-report.schema.json");
  compiled.validate(&report).expect("schema validation failed for milestone report");
}

#[test]
fn schema_rejects_a_score_under_the_wrong_tier_key() {
  let compiled = compile_schema("milestone-report.schema.json");
  let bad = serde_json::json!({
    "milestone_title": "Sprint-1",
    "issues": {},
    "llm_milestone_analysis": {
      "confidence_score": 50,
      "justification": "",
      "actionable_improvements": []
    }
  });

  assert!(!compiled.is_valid(&bad));
}
