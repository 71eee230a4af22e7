// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for the GitHub REST boundary (transport, wire types, scheduled client)
// role: github/namespace
// outputs: Public submodules api, client, wire
// invariants: Only this namespace knows about URLs, status codes and JSON field names
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod api;
pub mod client;
pub mod wire;
