// Driver for integration + snapshot tests under tests/integration/
// Keeps tests organized in a subdirectory while remaining visible to Cargo.
//
#[path = "integration/cli_config.rs"]
mod cli_config;
#[path = "integration/cli_gen_man.rs"]
mod cli_gen_man;
#[path = "integration/end_to_end.rs"]
mod end_to_end;
#[path = "integration/forge_fixture.rs"]
mod forge_fixture;
#[path = "integration/parser_properties.rs"]
mod parser_properties;
#[path = "integration/schema_validation.rs"]
mod schema_validation;

// snapshots
#[path = "integration/report_snapshot.rs"]
mod report_snapshot;
