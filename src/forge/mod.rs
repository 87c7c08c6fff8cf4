// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Code-forge collaborator behind a trait seam (GitHub HTTP backend and fixture backend)
// role: module/aggregation
// outputs: ForgeApi trait, backend constructors, token discovery
// invariants: Backends map GitHub payloads through the same JSON → model functions
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod github_api;

pub use github_api::{build_api, get_github_token, ForgeApi, GithubFixtureApi, GithubHttpApi, GITHUB_API_BASE};
