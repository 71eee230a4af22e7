use jsonschema::validator_for;
use test_support::{read_json, report_cmd, schema_path};

fn compile_schema(name: &str) -> jsonschema::Validator {
  let schema = read_json(&schema_path(name));
  validator_for(&schema).expect("compile schema")
}

fn report(fixture: &str, args: &[&str]) -> serde_json::Value {
  let out = report_cmd(fixture).args(args).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn default_report_conforms_to_schema() {
  let v = report("octo_widgets.json", &["octo/widgets", "--since", "2024-01-01", "--until", "2024-02-01"]);
  compile_schema("report.schema.json")
    .validate(&v)
    .expect("schema validation failed for default report");
}

#[test]
fn all_branches_report_conforms_to_schema() {
  let v = report(
    "octo_widgets.json",
    &["octo/widgets", "--since", "2024-01-01", "--until", "2024-02-01", "--all-branches"],
  );
  compile_schema("report.schema.json")
    .validate(&v)
    .expect("schema validation failed for all-branches report");
}

#[test]
fn empty_report_conforms_to_schema() {
  let v = report("octo_empty_month.json", &["octo/empty", "--month", "2024-01"]);
  compile_schema("report.schema.json")
    .validate(&v)
    .expect("schema validation failed for empty report");
}

#[test]
fn schema_rejects_bot_contributors() {
  let mut v = report("octo_widgets.json", &["octo/widgets", "--since", "2024-01-01", "--until", "2024-02-01"]);
  v["contributors"][0]["login"] = serde_json::json!("dependabot[bot]");
  assert!(!compile_schema("report.schema.json").is_valid(&v));
}
