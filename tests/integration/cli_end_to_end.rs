use predicates::prelude::*;
use test_support::{read_json, report_cmd, tempdir};

const FIXTURE: &str = "octo_widgets.json";

fn run(args: &[&str]) -> serde_json::Value {
  let out = report_cmd(FIXTURE).args(args).output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn report_on_stdout_matches_fixture_activity() {
  let v = run(&["octo/widgets", "--since", "2024-01-01", "--until", "2024-02-01"]);

  assert_eq!(v["repository"], "octo/widgets");
  assert_eq!(v["window"]["since"], "2024-01-01T00:00:00Z");
  assert_eq!(v["window"]["until"], "2024-02-01T00:00:00Z");
  assert_eq!(v["partial"], false);

  let s = &v["summary"];
  assert_eq!(s["prs_opened"], 2);
  assert_eq!(s["prs_merged"], 1);
  assert_eq!(s["pct_prs_reviewed"], 0.5);
  assert_eq!(s["direct_pushes"], 1);
  assert_eq!(s["issues_closed"], 1);
  assert_eq!(s["contributors_active"], 4);
  assert!(s.get("commits_all_branches").is_none());

  let logins: Vec<&str> = v["contributors"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["login"].as_str().unwrap())
    .collect();
  assert_eq!(logins, vec!["alice", "bob", "Dave Local", "carol"]);

  let pr2 = &v["pull_requests"][1];
  assert_eq!(pr2["number"], 2);
  assert_eq!(pr2["ci_outcome"], "failure");
  assert_eq!(pr2["linked_issue"], 5);
  assert!(pr2.get("commit_shas").is_none());

  assert_eq!(v["issues"][0]["linked_pull_requests"], serde_json::json!([2]));
}

#[test]
fn all_branches_adds_deduplicated_counts() {
  let v = run(&["octo/widgets", "--since", "2024-01-01", "--until", "2024-02-01", "--all-branches"]);

  assert_eq!(v["summary"]["commits_all_branches"], 4);
  let alice = v["contributors"]
    .as_array()
    .unwrap()
    .iter()
    .find(|c| c["login"] == "alice")
    .unwrap();
  assert_eq!(alice["commits_all_branches"], 3);
  assert_eq!(alice["commits"], 1);
}

#[test]
fn out_flag_writes_file_and_leaves_stdout_empty() {
  let dir = tempdir();
  let path = dir.path().join("report.json");

  report_cmd(FIXTURE)
    .args(["octo/widgets", "--since", "2024-01-01", "--until", "2024-02-01", "--out"])
    .arg(&path)
    .assert()
    .success()
    .stdout(predicate::str::is_empty());

  let v = read_json(&path);
  assert_eq!(v["summary"]["prs_opened"], 2);
}

#[test]
fn unknown_repository_fails_with_context() {
  report_cmd(FIXTURE)
    .args(["octo/missing", "--since", "2024-01-01", "--until", "2024-02-01"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("analyzing octo/missing"))
    .stderr(predicate::str::contains("not found"));
}
