//! Binary Integration Tests
//!
//! These tests spawn the built server and talk JSON-RPC to it over stdio.

#![allow(deprecated)] // Allow deprecated cargo_bin for now

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// MCP Test Client that communicates with the server via stdio
struct StdioClient {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    request_id: i64,
}

impl StdioClient {
    fn spawn() -> Result<Self, Box<dyn std::error::Error>> {
        let mut child = Command::cargo_bin("mcp-starter")?
            .args(["--transport", "stdio", "--long-task-step-ms", "1"])
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take().ok_or("no stdin")?;
        let stdout = BufReader::new(child.stdout.take().ok_or("no stdout")?);

        Ok(Self {
            child,
            stdin,
            stdout,
            request_id: 0,
        })
    }

    /// Send a request and return its response, skipping notifications.
    fn request(&mut self, method: &str, params: Value) -> Result<Value, Box<dyn std::error::Error>> {
        self.request_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.request_id,
            "method": method,
            "params": params
        });
        writeln!(self.stdin, "{}", serde_json::to_string(&request)?)?;
        self.stdin.flush()?;

        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err("server closed stdout".into());
            }
            let message: Value = serde_json::from_str(&line)?;
            if message["id"] == self.request_id {
                return Ok(message);
            }
        }
    }

    fn initialize(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        self.request(
            "initialize",
            json!({
                "protocolVersion": "2025-11-25",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0.0" }
            }),
        )
    }
}

impl Drop for StdioClient {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

#[test]
fn test_binary_help() {
    AssertCommand::cargo_bin("mcp-starter")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("MCP server"))
        .stdout(predicate::str::contains("--transport"));
}

#[test]
fn test_binary_version() {
    AssertCommand::cargo_bin("mcp-starter")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcp-starter"));
}

#[test]
fn test_rejects_unknown_transport() {
    AssertCommand::cargo_bin("mcp-starter")
        .unwrap()
        .args(["--transport", "carrier-pigeon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("carrier-pigeon"));
}

#[test]
fn test_stdio_initialize_and_call() {
    let mut client = StdioClient::spawn().expect("Failed to spawn MCP server");

    let init = client.initialize().expect("Failed to initialize");
    assert_eq!(init["result"]["serverInfo"]["name"], "mcp-starter");

    let tools = client.request("tools/list", json!({})).expect("tools/list");
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .expect("tools should be array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"hello"));
    assert!(!names.contains(&"bonus_calculator"));

    let hello = client
        .request("tools/call", json!({"name": "hello", "arguments": {"name": "Ada"}}))
        .expect("tools/call");
    assert_eq!(
        hello["result"]["content"][0]["text"],
        "Hello, Ada! Welcome to MCP."
    );

    let unknown = client
        .request("tools/call", json!({"name": "nonexistent_tool", "arguments": {}}))
        .expect("tools/call");
    assert_eq!(unknown["error"]["code"], -32602);
}

#[test]
fn test_stdio_progress_then_result() {
    let mut client = StdioClient::spawn().expect("Failed to spawn MCP server");
    client.initialize().expect("Failed to initialize");

    let response = client
        .request(
            "tools/call",
            json!({
                "name": "long_task",
                "arguments": {"taskName": "stdio"},
                "_meta": {"progressToken": 1}
            }),
        )
        .expect("tools/call");
    assert!(response["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("completed successfully"));
}
