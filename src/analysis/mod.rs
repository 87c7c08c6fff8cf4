// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Group the scoring pipeline pieces (templates, model client, response parser, tier analyzers)
// role: module/aggregation
// outputs: prompts, client, parser, analyzers
// invariants: Templates and parser rules evolve together (prompts::TEMPLATE_VERSION)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod analyzers;
pub mod client;
pub mod parser;
pub mod prompts;

pub use analyzers::{Analyzer, SnippetLimits};
pub use client::{ModelBackend, TextGenerationClient};
