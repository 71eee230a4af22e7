// Driver for integration tests under tests/integration/
// Keeps tests organized in a subdirectory while remaining visible to Cargo.
//
#[path = "integration/cli_end_to_end.rs"]
mod cli_end_to_end;
#[path = "integration/cli_windows.rs"]
mod cli_windows;
#[path = "integration/schema_validation.rs"]
mod schema_validation;
