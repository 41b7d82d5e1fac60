use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

use assert_cmd::Command;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

fn roster_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("roster"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

fn write_payload(dir: &TempDir, name: &str, payload: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string(payload).unwrap()).expect("write payload");
    path
}

fn run_json(home: &TempDir, args: &[&str]) -> Value {
    let output = roster_cmd(home.path())
        .args(args)
        .output()
        .expect("run roster");
    assert!(
        output.status.success(),
        "command failed: status={} stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr),
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn initialize_then_sync_reports_created_updated_missing() {
    let home = TempDir::new().expect("home");
    let first = write_payload(
        &home,
        "first.json",
        &json!([
            { "EMPLOYEE ID NUMBER": "A", "FIRST NAME": "Ana" },
            { "EMPLOYEE ID NUMBER": "B", "FIRST NAME": "Ben" },
            { "EMPLOYEE ID NUMBER": "C", "FIRST NAME": "Cy" },
        ]),
    );
    let second = write_payload(
        &home,
        "second.json",
        &json!([
            { "EMPLOYEE ID NUMBER": "A", "FIRST NAME": "Anabel" },
            { "EMPLOYEE ID NUMBER": "D", "FIRST NAME": "Dee" },
        ]),
    );

    let init = run_json(&home, &["initialize", first.to_str().unwrap()]);
    assert_eq!(init["status"], "ok");
    assert_eq!(init["summary"]["mode"], "initialize");
    assert_eq!(init["summary"]["created"], 3);
    assert!(init["details"].get("updated").is_none());

    let sync = run_json(&home, &["sync", second.to_str().unwrap()]);
    assert_eq!(sync["summary"]["mode"], "sync");
    assert_eq!(sync["details"]["created"], json!(["D"]));
    assert_eq!(sync["details"]["updated"], json!(["A"]));
    assert_eq!(sync["details"]["missing"], json!(["B", "C"]));

    let inactive = run_json(&home, &["list", "--inactive", "--json"]);
    let keys: Vec<&str> = inactive
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["empno"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["B", "C"]);

    let log = run_json(&home, &["log", "--json"]);
    assert_eq!(log.as_array().unwrap().len(), 2);
    assert_eq!(log[0]["summary"]["mode"], "sync", "newest entry first");
}

#[test]
fn object_payload_exits_non_zero_with_error_body() {
    let home = TempDir::new().expect("home");
    let bad = write_payload(&home, "bad.json", &json!({ "foo": "bar" }));

    roster_cmd(home.path())
        .args(["sync", bad.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("Payload must be a JSON array of objects."))
        .stderr(contains("422"));

    let data_dir = home.path().join(".roster");
    assert!(
        !data_dir.join("sync_logs.jsonl").exists(),
        "rejected payload must not be logged"
    );
    assert!(!data_dir.join("directory.json").exists());
}

#[test]
fn data_dir_flag_overrides_default_location() {
    let home = TempDir::new().expect("home");
    let data = TempDir::new().expect("data");
    let payload = write_payload(&home, "p.json", &json!([{ "EMPLOYEE ID NUMBER": "E1" }]));

    roster_cmd(home.path())
        .args(["--data-dir", data.path().to_str().unwrap()])
        .args(["initialize", payload.to_str().unwrap()])
        .assert()
        .success();

    assert!(data.path().join("directory.json").exists());
    assert!(!home.path().join(".roster").join("directory.json").exists());
}

#[test]
fn stdin_payload_is_accepted() {
    let home = TempDir::new().expect("home");
    roster_cmd(home.path())
        .args(["initialize", "-"])
        .write_stdin(r#"[{"EMPLOYEE ID NUMBER":"S1"},{"EMPLOYEE ID NUMBER":""}]"#)
        .assert()
        .success()
        .stdout(contains("\"missing_key\""));
}

#[test]
fn pull_without_url_explains_how_to_configure() {
    let home = TempDir::new().expect("home");
    roster_cmd(home.path())
        .arg("pull")
        .assert()
        .failure()
        .stderr(contains("roster config --source-url"));
}

/// Answer every request on a local port with `503` and a short body.
fn unavailable_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut line = String::new();
            while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let _ = stream.write_all(
                b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 5\r\nConnection: close\r\n\r\nquota",
            );
        }
    });
    format!("http://{addr}/roster.json")
}

#[test]
fn pull_from_failing_endpoint_reports_502_and_logs_nothing() {
    let home = TempDir::new().expect("home");
    let url = unavailable_endpoint();

    roster_cmd(home.path())
        .args(["pull", "--url", url.as_str()])
        .assert()
        .failure()
        .stdout(contains("quota"))
        .stderr(contains("502"));

    assert!(!home.path().join(".roster").join("sync_logs.jsonl").exists());
}

#[test]
fn config_persists_source_url() {
    let home = TempDir::new().expect("home");
    roster_cmd(home.path())
        .args(["config", "--source-url", "https://example.org/roster.json"])
        .assert()
        .success()
        .stdout(contains("source_url: https://example.org/roster.json"));

    roster_cmd(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(contains("https://example.org/roster.json"));
}

#[test]
fn list_on_empty_directory_points_at_initialize() {
    let home = TempDir::new().expect("home");
    roster_cmd(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("roster initialize"));
}
