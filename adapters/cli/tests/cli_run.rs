use std::process::Command;

fn mazecrawl(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_mazecrawl"))
        .args(args)
        .output()
        .expect("failed to launch the mazecrawl binary");
    assert!(
        output.status.success(),
        "mazecrawl {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 output")
}

#[test]
fn json_summary_counts_throttled_frames() {
    let stdout = mazecrawl(&["--seed", "cli", "--ticks", "30", "--bots", "2", "--format", "json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("json summary");

    assert_eq!(summary["ticks"], 30);
    assert_eq!(summary["columns"], 256);
    let sessions = summary["sessions"].as_object().expect("sessions");
    assert_eq!(sessions.len(), 2);
    for entry in sessions.values() {
        assert_eq!(entry["frames"], 10);
        assert!(entry["cell"].is_object());
        assert!(entry["seen"].as_u64().expect("seen count") > 0);
    }
}

#[test]
fn exported_tokens_restore_the_first_bot() {
    let stdout = mazecrawl(&["--seed", "cli", "--ticks", "12", "--bots", "1", "--export", "--format", "json"]);
    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("json summary");
    let first = &summary["sessions"]["bot-0"];
    let token = first["token"].as_str().expect("token exported");
    assert!(token.starts_with("mazecrawl:v1:"));

    let resumed = mazecrawl(&["--seed", "cli", "--ticks", "0", "--bots", "1", "--restore", token, "--format", "json"]);
    let resumed: serde_json::Value = serde_json::from_str(&resumed).expect("json summary");
    assert_eq!(resumed["sessions"]["bot-0"]["cell"], first["cell"]);
}

#[test]
fn malformed_tokens_fail_the_run() {
    let output = Command::new(env!("CARGO_BIN_EXE_mazecrawl"))
        .args(["--ticks", "1", "--restore", "maze:v1:nope"])
        .output()
        .expect("failed to launch the mazecrawl binary");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("restore token"));
}

#[test]
fn text_summary_greets_and_lists_bots() {
    let stdout = mazecrawl(&["--seed", "cli", "--ticks", "3", "--bots", "3"]);
    assert!(stdout.starts_with("Welcome to Mazecrawl."));
    for bot in ["bot-0", "bot-1", "bot-2"] {
        assert!(stdout.contains(&format!("{bot}: ")), "{stdout}");
    }
}
