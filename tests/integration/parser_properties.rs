use proptest::prelude::*;
use release_readiness::analysis::parser::parse;
use release_readiness::model::Tier;

fn tier() -> impl Strategy<Value = Tier> {
  prop_oneof![Just(Tier::Commit), Just(Tier::PullRequest), Just(Tier::Milestone)]
}

proptest! {
  #[test]
  fn well_formed_answers_parse_back_exactly(
    tier in tier(),
    score in 0u8..=100,
    justification in "[a-z][a-z .,]{0,80}",
    items in proptest::collection::vec("[a-z]([a-z ]{0,30}[a-z])?", 0..5),
  ) {
    let justification = justification.trim().to_string();
    let mut raw = format!("{}: {}\nJustification: {}\nActionable Improvements:\n", tier.score_label(), score, justification);
    for item in &items {
      raw.push_str(&format!("- {}\n", item));
    }

    let parsed = parse(tier, &raw);
    prop_assert_eq!(parsed.tier, tier);
    prop_assert_eq!(parsed.score, Some(score));
    prop_assert_eq!(parsed.justification, justification);
    prop_assert_eq!(parsed.improvements, items);
  }

  #[test]
  fn arbitrary_text_never_yields_out_of_range_scores(tier in tier(), raw in "\\PC{0,200}") {
    let parsed = parse(tier, &raw);
    prop_assert!(parsed.score.map_or(true, |s| s <= 100));
    prop_assert!(parsed.improvements.iter().all(|i| !i.trim().is_empty()));
  }
}
