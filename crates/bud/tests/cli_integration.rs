//! CLI integration tests for the Bud command-line interface.
//!
//! Each test points the binary at a temporary config that disables the log
//! file and at a `.mcp.json` that does not exist, so only the built-in tools
//! are served.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Get a command for the bud binary.
fn bud() -> Command {
    Command::cargo_bin("bud").unwrap()
}

/// A command running inside `dir` with a quiet config file.
fn bud_in(dir: &Path) -> Command {
    let config = dir.join("bud.toml");
    std::fs::write(
        &config,
        "[logging]\nfile = false\n\n[proxy]\nmcp_config = \"missing/.mcp.json\"\n",
    )
    .unwrap();

    let mut cmd = bud();
    cmd.current_dir(dir)
        .env_remove("BUD_MCP_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config);
    cmd
}

fn lines(messages: &[Value]) -> String {
    messages.iter().map(|m| format!("{m}\n")).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    bud()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tool gateway"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_version_displays() {
    bud()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bud"));
}

#[test]
fn test_serve_help_mentions_http() {
    bud()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--http"))
        .stdout(predicate::str::contains("--mcp-config"));
}

#[test]
fn test_unknown_subcommand_fails() {
    bud().arg("frobnicate").assert().failure();
}

#[test]
fn test_missing_config_file_fails() {
    bud()
        .args(["--config", "/nonexistent/bud.toml", "tools"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/bud.toml"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools Command
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_tools_lists_builtins() {
    let dir = TempDir::new().unwrap();
    bud_in(dir.path())
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("echo"))
        .stdout(predicate::str::contains("gateway_status"))
        .stdout(predicate::str::contains("no child servers"));
}

#[test]
fn test_tools_json_is_wire_format() {
    let dir = TempDir::new().unwrap();
    let output = bud_in(dir.path())
        .args(["--json", "tools"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tools: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tools[0]["name"], "echo");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["message"]));
    assert_eq!(tools[1]["name"], "gateway_status");
}

// ─────────────────────────────────────────────────────────────────────────────
// Serve Command (stdio)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_serve_stdio_session() {
    let dir = TempDir::new().unwrap();
    let input = lines(&[
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
               "params": {"protocolVersion": "2024-11-05",
                          "clientInfo": {"name": "test", "version": "1"}}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "echo", "arguments": {"message": "hi"}}}),
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
               "params": {"name": "nope", "arguments": {}}}),
        json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}),
    ]);

    let output = bud_in(dir.path())
        .arg("serve")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let responses: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 5);

    assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "bud2");

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["echo", "gateway_status"]);

    assert_eq!(responses[2]["result"]["content"][0]["text"], "hi");
    assert!(responses[2]["result"].get("isError").is_none());

    assert_eq!(responses[3]["result"]["isError"], true);
    assert_eq!(responses[3]["result"]["content"][0]["text"], "Unknown tool: nope");

    assert_eq!(responses[4]["error"]["code"], -32601);
}

#[test]
fn test_serve_skips_garbage_lines() {
    let dir = TempDir::new().unwrap();
    let input = format!(
        "\nnot json at all\n{}\n",
        json!({"jsonrpc": "2.0", "id": 9, "method": "tools/list"})
    );

    bud_in(dir.path())
        .arg("serve")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":9"#))
        .stdout(predicate::str::contains("gateway_status"));
}

#[test]
fn test_serve_empty_input_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    bud_in(dir.path())
        .arg("serve")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
