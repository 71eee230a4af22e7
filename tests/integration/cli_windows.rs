use predicates::prelude::*;
use test_support::report_cmd;

#[test]
fn errors_when_no_time_selection() {
  report_cmd("octo_widgets.json")
    .arg("octo/widgets")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Provide one of --month or --since [--until]"));
}

#[test]
fn inverted_window_is_rejected() {
  report_cmd("octo_widgets.json")
    .args(["octo/widgets", "--since", "2024-02-01", "--until", "2024-01-01"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("is after its end"));
}

#[test]
fn future_window_is_rejected() {
  report_cmd("octo_widgets.json")
    .args(["octo/widgets", "--since", "2024-07-01"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("in the future"));
}

#[test]
fn malformed_repository_is_rejected() {
  report_cmd("octo_widgets.json")
    .args(["widgets", "--month", "2024-01"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("expected owner/repo"));
}

#[test]
fn month_window_covers_the_whole_month() {
  let out = report_cmd("octo_empty_month.json")
    .args(["octo/empty", "--month", "2024-01"])
    .output()
    .unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

  let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(v["window"]["since"], "2024-01-01T00:00:00Z");
  assert_eq!(v["window"]["until"], "2024-01-31T23:59:59Z");
  assert_eq!(v["summary"]["pct_prs_reviewed"], 0.0);
  assert_eq!(v["contributors"], serde_json::json!([]));
}
