//! ---
//! rra_section: "12-testing-qa"
//! rra_subsection: "integration-tests"
//! rra_type: "test"
//! rra_scope: "code"
//! rra_description: "Command-line behaviour of the bridge control utility."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use std::fs;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::tempdir;

fn bridgectl() -> Command {
    let mut cmd = Command::cargo_bin("rra-bridgectl").expect("binary built");
    cmd.env_remove("RRA_CONFIG");
    cmd
}

const TRANSCRIPT: &str = r#"{"data": {"channelId": "rra-frontend", "type": "loaded"}}
{"data": {"channelId": "rra-frontend", "type": "ready", "mapWidth": 800, "mapHeight": 600}}

{"origin": "https://evil.example.com", "data": {"channelId": "rra-frontend", "type": "save:status", "enabled": false}}
{"data": {"channelId": "rra-frontend", "type": "save:status", "enabled": true}}
{"data": {"channelId": "other", "type": "ready", "mapWidth": 1, "mapHeight": 1}}
"#;

#[test]
fn replay_reports_session_state_and_posted_envelopes() {
    let dir = tempdir().expect("tempdir");
    let transcript = dir.path().join("editor.ndjson");
    fs::write(&transcript, TRANSCRIPT).expect("write transcript");

    let output = bridgectl()
        .args(["replay", "--project", "42", "--scenario", "0", "--save", "--transcript"])
        .arg(&transcript)
        .output()
        .expect("run replay");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["replayed"], 5);
    assert_eq!(report["save"], "sent");
    assert_eq!(report["loading_depth"], 0);
    assert_eq!(report["state"]["editor_loaded"], true);
    assert_eq!(report["state"]["save_enabled"], true);
    assert_eq!(report["state"]["editor_width"], 800.0);
    assert_eq!(report["metrics"]["received"], 3);
    assert_eq!(report["metrics"]["rejected"], 2);
    let exported = report["prometheus"].as_str().expect("prometheus text");
    assert!(exported.contains("bridge_envelopes_sent_total 3"));
    assert!(exported.contains("bridge_envelopes_rejected_total 2"));

    let posted = report["posted"].as_array().expect("posted list");
    let kinds: Vec<&str> = posted
        .iter()
        .map(|message| message["data"]["type"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(kinds, ["settings", "settings", "save:click"]);
    assert!(posted
        .iter()
        .all(|message| message["target_origin"] == "http://localhost:8000"));
    assert_eq!(posted[0]["data"]["projectId"], 42);
}

#[test]
fn replay_honours_config_file() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("bridge.toml");
    fs::write(
        &config,
        "[editor]\nurl = \"https://editor.example.org/id/\"\nchannel_id = \"custom\"\nallow_any_origin = true\n\n[metrics]\nenabled = false\n",
    )
    .expect("write config");
    let transcript = dir.path().join("editor.ndjson");
    fs::write(
        &transcript,
        "{\"origin\": \"https://anything.example\", \"data\": {\"channelId\": \"custom\", \"type\": \"save:status\", \"enabled\": false}}\n",
    )
    .expect("write transcript");

    let output = bridgectl()
        .args(["replay", "--project", "1", "--scenario", "2", "--save"])
        .arg("--transcript")
        .arg(&transcript)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run replay");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["channel_id"], "custom");
    assert!(report.get("prometheus").is_none());
    assert_eq!(report["save"], "nothing_to_save");
    assert_eq!(report["metrics"]["received"], 1);
    let posted = report["posted"].as_array().expect("posted list");
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["target_origin"], "*");
    assert_eq!(posted[0]["data"]["channelId"], "custom");
}

#[test]
fn replay_fails_for_missing_transcript() {
    let dir = tempdir().expect("tempdir");
    bridgectl()
        .args(["replay", "--project", "1", "--scenario", "1", "--transcript"])
        .arg(dir.path().join("missing.ndjson"))
        .assert()
        .failure();
}

#[test]
fn url_prints_editor_location() {
    let output = bridgectl()
        .args(["url", "--bbox=-10,-10,10,10", "--width", "800", "--height", "600"])
        .output()
        .expect("run url");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "http://localhost:8000/#map=5/0/0"
    );
}

#[test]
fn url_uses_configured_editor_base() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("bridge.toml");
    fs::write(&config, "[editor]\nurl = \"https://editor.example.org/id/\"\n").expect("write config");

    let output = bridgectl()
        .arg("--config")
        .arg(&config)
        .args(["url", "--bbox", "-10,-10,10,10"])
        .output()
        .expect("run url");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "https://editor.example.org/id/#map=0/0/0"
    );
}

#[test]
fn url_rejects_malformed_bbox() {
    bridgectl()
        .args(["url", "--bbox", "1,2,3"])
        .assert()
        .failure();
}
