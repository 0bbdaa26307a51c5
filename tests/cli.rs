use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use ci_guard::stop::retry::RetryCounter;
use serde_json::Value;

const VERIFY_CI: &str = env!("CARGO_BIN_EXE_verify-ci");
const TRACK_CI_FAILURES: &str = env!("CARGO_BIN_EXE_track-ci-failures");

const TRACKER_VARS: [&str; 6] = [
    "GITHUB_REPOSITORY",
    "PR_NUMBER",
    "WORKFLOW_NAME",
    "RUN_URL",
    "RUN_ID",
    "HEAD_SHA",
];

/// `verify-ci` with a clean environment apart from `envs`, fed `stdin`.
fn verify_ci(cwd: &Path, envs: &[(&str, &str)], stdin: &str) -> Output {
    let mut cmd = Command::new(VERIFY_CI);
    cmd.current_dir(cwd)
        .env_remove("CLAUDE_PROJECT_DIR")
        .env_remove("MAX_STOP_RETRIES")
        .env_remove("CLAUDE_STOP_STATE_DIR")
        .env_remove("RUST_LOG")
        .envs(envs.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

/// The one decision line; fails if stdout carries anything else.
fn decision(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout must be one line, got {stdout:?}");
    serde_json::from_str(lines[0]).unwrap()
}

/// A project whose only check always fails, whether or not pnpm is installed.
fn failing_project(dir: &Path) {
    fs::write(
        dir.join("package.json"),
        r#"{"name":"t","scripts":{"test":"exit 1"}}"#,
    )
    .unwrap();
}

#[test]
fn empty_project_prints_bare_approve() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let out = verify_ci(
        project.path(),
        &[
            ("CLAUDE_PROJECT_DIR", project.path().to_str().unwrap()),
            ("CLAUDE_STOP_STATE_DIR", state.path().to_str().unwrap()),
        ],
        "",
    );

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "{\"decision\":\"approve\"}\n");
}

#[test]
fn failing_check_blocks_and_logs_to_stderr_only() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    failing_project(project.path());

    let out = verify_ci(
        project.path(),
        &[
            ("CLAUDE_PROJECT_DIR", project.path().to_str().unwrap()),
            ("CLAUDE_STOP_STATE_DIR", state.path().to_str().unwrap()),
        ],
        "",
    );

    assert!(out.status.success());
    let decision = decision(&out);
    assert_eq!(decision["decision"], "block");
    assert!(decision["reason"].as_str().unwrap().contains("attempt 1/3: tests failed"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Running tests..."));

    let counter = RetryCounter::for_project(state.path(), project.path());
    assert_eq!(fs::read_to_string(counter.path()).unwrap(), "1");
}

#[test]
fn bad_retry_cap_still_yields_a_decision() {
    for value in ["0", "abc", "", "-2"] {
        let project = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        failing_project(project.path());

        let out = verify_ci(
            project.path(),
            &[
                ("CLAUDE_PROJECT_DIR", project.path().to_str().unwrap()),
                ("CLAUDE_STOP_STATE_DIR", state.path().to_str().unwrap()),
                ("MAX_STOP_RETRIES", value),
            ],
            "",
        );

        assert_eq!(out.status.code(), Some(0), "MAX_STOP_RETRIES={value:?}");
        let decision = decision(&out);
        let expected = if value == "0" { "approve" } else { "block" };
        assert_eq!(decision["decision"], expected, "MAX_STOP_RETRIES={value:?}");
    }
}

#[test]
fn unknown_flag_fails_open() {
    let project = tempfile::tempdir().unwrap();
    let mut cmd = Command::new(VERIFY_CI);
    let out = cmd
        .arg("--no-such-flag")
        .current_dir(project.path())
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(out.status.success());
    assert_eq!(decision(&out)["decision"], "approve");
}

#[test]
fn hook_payload_cwd_is_used_without_override() {
    let project = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    failing_project(project.path());
    let payload = serde_json::json!({
        "session_id": "s",
        "cwd": project.path(),
        "hook_event_name": "Stop",
        "stop_hook_active": false,
    })
    .to_string();

    let out = verify_ci(
        elsewhere.path(),
        &[("CLAUDE_STOP_STATE_DIR", state.path().to_str().unwrap())],
        &payload,
    );

    assert_eq!(decision(&out)["decision"], "block");
    let counter = RetryCounter::for_project(state.path(), project.path());
    assert!(counter.path().exists());
}

#[test]
fn explicit_project_dir_beats_hook_payload() {
    let failing = tempfile::tempdir().unwrap();
    let clean = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    failing_project(failing.path());
    let payload = serde_json::json!({ "cwd": failing.path() }).to_string();

    let out = verify_ci(
        failing.path(),
        &[
            ("CLAUDE_PROJECT_DIR", clean.path().to_str().unwrap()),
            ("CLAUDE_STOP_STATE_DIR", state.path().to_str().unwrap()),
        ],
        &payload,
    );

    assert_eq!(decision(&out)["decision"], "approve");
    assert_eq!(fs::read_dir(state.path()).unwrap().count(), 0);
}

fn track_ci_failures(envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(TRACK_CI_FAILURES);
    for var in TRACKER_VARS {
        cmd.env_remove(var);
    }
    cmd.envs(envs.iter().copied())
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

#[test]
fn tracker_requires_its_environment() {
    let out = track_ci_failures(&[("GITHUB_REPOSITORY", "owner/repo"), ("PR_NUMBER", "42")]);

    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("WORKFLOW_NAME") || stderr.contains("--workflow"), "{stderr}");
}

#[test]
fn tracker_rejects_non_integer_ids() {
    let out = track_ci_failures(&[
        ("GITHUB_REPOSITORY", "owner/repo"),
        ("PR_NUMBER", "42"),
        ("WORKFLOW_NAME", "CI"),
        ("RUN_URL", "https://github.com/owner/repo/actions/runs/1"),
        ("RUN_ID", "not-a-number"),
        ("HEAD_SHA", "abc1234def5678"),
    ]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not-a-number"));
}
