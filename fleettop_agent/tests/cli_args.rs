//! CLI arg handling tests for the agent binary.

use std::process::Command;

#[test]
fn help_mentions_expected_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_fleettop_agent"))
        .arg("--help")
        .output()
        .expect("run fleettop_agent --help");
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        text.contains("--host") && text.contains("--port") && text.contains("--id"),
        "help text missing expected flags\n{text}"
    );
}
