mod common;

use common::cli::{CliWorkspace, jbulk};
use predicates::prelude::*;
use serde_json::Value;

fn stderr_json(output: &std::process::Output) -> Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').expect("json on stderr");
    serde_json::from_str(stderr[start..].trim()).expect("parse error json")
}

#[test]
fn e2e_missing_credentials_exits_2() {
    let _log = common::test_log("e2e_missing_credentials_exits_2");
    let workspace = CliWorkspace::new();

    jbulk(&workspace, ["--project", "SEC", "--dry-run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("JiraCredentials.json"));
}

#[test]
fn e2e_malformed_credentials_exits_2() {
    let _log = common::test_log("e2e_malformed_credentials_exits_2");
    let workspace = CliWorkspace::new();
    workspace.write_credentials("{not json");

    let output = jbulk(&workspace, ["--project", "SEC", "--json"])
        .output()
        .expect("run jbulk");
    assert_eq!(output.status.code(), Some(2));
    let json = stderr_json(&output);
    assert_eq!(json["error"]["code"], "CREDENTIALS_INVALID");
}

#[test]
fn e2e_incomplete_credentials_exits_2() {
    let _log = common::test_log("e2e_incomplete_credentials_exits_2");
    let workspace = CliWorkspace::new();
    workspace.write_credentials(r#"{"email": "dev@example.com"}"#);

    jbulk(&workspace, ["--project", "SEC"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("api_token"));
}

#[test]
fn e2e_credentials_flag_overrides_default_location() {
    let _log = common::test_log("e2e_credentials_flag_overrides_default_location");
    let workspace = CliWorkspace::new();
    workspace.write_unreachable_credentials();
    let elsewhere = workspace.root.join("missing.json");

    jbulk(&workspace, ["--project", "SEC", "--credentials"])
        .arg(&elsewhere)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn e2e_neither_scope_exits_4() {
    let _log = common::test_log("e2e_neither_scope_exits_4");
    let workspace = CliWorkspace::new();

    let output = jbulk(&workspace, ["--add-label", "x", "--json"])
        .output()
        .expect("run jbulk");
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stderr_json(&output)["error"]["code"], "INVALID_SCOPE");
}

#[test]
fn e2e_both_scopes_exits_4() {
    let _log = common::test_log("e2e_both_scopes_exits_4");
    let workspace = CliWorkspace::new();

    jbulk(&workspace, ["--board-name", "AppSec Board", "--project", "SEC"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("cannot be used together"));
}

#[test]
fn e2e_bad_created_on_exits_5() {
    let _log = common::test_log("e2e_bad_created_on_exits_5");
    let workspace = CliWorkspace::new();

    jbulk(&workspace, ["--project", "SEC", "--created-on", "2025-08-12"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("DD-MM-YYYY"));
}

#[test]
fn e2e_unreachable_backend_is_auth_failure() {
    let _log = common::test_log("e2e_unreachable_backend_is_auth_failure");
    let workspace = CliWorkspace::new();
    workspace.write_unreachable_credentials();

    let output = jbulk(&workspace, ["--project", "SEC", "--dry-run", "--json"])
        .output()
        .expect("run jbulk");
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stderr_json(&output)["error"]["code"], "AUTH_FAILED");
    assert!(output.stdout.is_empty(), "nothing printed before auth");
}

#[test]
fn e2e_help_lists_action_flags() {
    let workspace = CliWorkspace::new();
    jbulk(&workspace, ["--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--add-label")
                .and(predicate::str::contains("--move-to"))
                .and(predicate::str::contains("--set-due-date"))
                .and(predicate::str::contains("--dry-run")),
        );
}
