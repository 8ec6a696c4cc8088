//! In-memory child servers for unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::child::{ChildLauncher, ChildProcess};
use crate::error::{McpError, Result};
use crate::proxy::ChildServerConfig;

/// What a fake child observed.
#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub written: Vec<Value>,
    /// A request arrived while an earlier response was still unread.
    pub interleaved: bool,
    pub stdin_closed: u32,
    pub killed: u32,
    pub waited: u32,
}

impl FakeState {
    pub fn methods(&self) -> Vec<String> {
        self.written
            .iter()
            .filter_map(|m| m["method"].as_str().map(str::to_string))
            .collect()
    }
}

struct Pending {
    line: String,
    delay: Option<Duration>,
    is_response: bool,
}

/// Answers MCP requests from a fixed tool list.
///
/// `echo` returns its `tag` argument, `mixed` returns it after a resource and
/// an audio block, `fail` reports a tool error, `slow` answers after ten seconds.
pub(crate) struct FakeChild {
    tools: Vec<String>,
    outbox: VecDeque<Pending>,
    noise: bool,
    fail_initialize: bool,
    exit_on_call: bool,
    stdin_open: bool,
    state: Arc<Mutex<FakeState>>,
}

impl FakeChild {
    pub fn new(tools: &[&str]) -> (Self, Arc<Mutex<FakeState>>) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let child = Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            outbox: VecDeque::new(),
            noise: false,
            fail_initialize: false,
            exit_on_call: false,
            stdin_open: true,
            state: Arc::clone(&state),
        };
        (child, state)
    }

    /// Print a banner, a notification and a stale response before every answer.
    pub fn with_noise(mut self) -> Self {
        self.noise = true;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Close stdout instead of answering `tools/call`.
    pub fn exiting_on_call(mut self) -> Self {
        self.exit_on_call = true;
        self
    }

    fn push(&mut self, message: Value, delay: Option<Duration>) {
        self.outbox.push_back(Pending {
            line: message.to_string(),
            delay,
            is_response: true,
        });
    }

    fn push_noise(&mut self) {
        for line in [
            "fake-server v1 starting up".to_string(),
            String::new(),
            json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}})
                .to_string(),
            json!({"jsonrpc": "2.0", "id": 999_999, "result": {}}).to_string(),
        ] {
            self.outbox.push_back(Pending {
                line,
                delay: None,
                is_response: false,
            });
        }
    }

    fn answer(&mut self, id: Value, method: &str, params: &Value) {
        let ok = |result: Value| json!({"jsonrpc": "2.0", "id": id, "result": result});
        let err = |code: i64, message: &str| {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        };

        match method {
            "initialize" if self.fail_initialize => self.push(err(-32603, "init failed"), None),
            "initialize" => self.push(
                ok(json!({
                    "protocolVersion": "2024-11-05",
                    "serverInfo": {"name": "fake-server", "version": "1.0"},
                    "capabilities": {"tools": {}}
                })),
                None,
            ),
            "tools/list" => {
                let tools: Vec<Value> = self
                    .tools
                    .iter()
                    .map(|name| {
                        json!({
                            "name": name,
                            "description": format!("fake {name}"),
                            "inputSchema": {
                                "type": "object",
                                "properties": {"tag": {"type": "string", "description": "Tag"}}
                            }
                        })
                    })
                    .collect();
                self.push(ok(json!({"tools": tools})), None);
            }
            "tools/call" if self.exit_on_call => {}
            "tools/call" => {
                let name = params["name"].as_str().unwrap_or_default();
                let tag = params["arguments"]["tag"].as_str().unwrap_or_default();
                match name {
                    "echo" => self.push(ok(json!({"content": [{"type": "text", "text": tag}]})), None),
                    "slow" => self.push(
                        ok(json!({"content": [{"type": "text", "text": tag}]})),
                        Some(Duration::from_secs(10)),
                    ),
                    "mixed" => self.push(
                        ok(json!({"content": [
                            {"type": "resource", "resource": {"uri": "file:///notes.md", "text": "raw"}},
                            {"type": "audio", "data": "AAAA", "mimeType": "audio/wav"},
                            {"type": "text", "text": tag}
                        ]})),
                        None,
                    ),
                    "fail" => self.push(
                        ok(json!({"content": [{"type": "text", "text": "boom"}], "isError": true})),
                        None,
                    ),
                    other => self.push(
                        ok(json!({
                            "content": [{"type": "text", "text": format!("Unknown tool: {other}")}],
                            "isError": true
                        })),
                        None,
                    ),
                }
            }
            _ => self.push(err(-32601, "Method not found"), None),
        }
    }
}

#[async_trait]
impl ChildProcess for FakeChild {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        if !self.stdin_open {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin closed"));
        }
        let message: Value = serde_json::from_str(line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        {
            let mut state = self.state.lock();
            if self.outbox.iter().any(|p| p.is_response) {
                state.interleaved = true;
            }
            state.written.push(message.clone());
        }

        let Some(id) = message.get("id").cloned() else {
            return Ok(());
        };
        let method = message["method"].as_str().unwrap_or_default().to_string();
        if self.noise {
            self.push_noise();
        }
        self.answer(id, &method, &message["params"]);
        Ok(())
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        tokio::task::yield_now().await;
        if let Some(delay) = self.outbox.front_mut().and_then(|p| p.delay.take()) {
            tokio::time::sleep(delay).await;
        }
        Ok(self.outbox.pop_front().map(|p| p.line))
    }

    async fn close_stdin(&mut self) -> io::Result<()> {
        self.stdin_open = false;
        self.state.lock().stdin_closed += 1;
        Ok(())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.state.lock().killed += 1;
        Ok(())
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        self.state.lock().waited += 1;
        Ok(Some(0))
    }
}

/// Launches fake children keyed by command; unknown commands fail to spawn.
#[derive(Default)]
pub(crate) struct FakeLauncher {
    commands: HashMap<String, Vec<String>>,
    pub states: Mutex<Vec<(String, Arc<Mutex<FakeState>>)>>,
}

impl FakeLauncher {
    pub fn with_command(mut self, command: &str, tools: &[&str]) -> Self {
        self.commands.insert(
            command.to_string(),
            tools.iter().map(|t| t.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl ChildLauncher for FakeLauncher {
    async fn launch(&self, config: &ChildServerConfig) -> Result<Box<dyn ChildProcess>> {
        let tools = self.commands.get(&config.command).ok_or_else(|| {
            McpError::spawn_failed(format!("failed to spawn '{}': not found", config.command))
        })?;
        let names: Vec<&str> = tools.iter().map(String::as_str).collect();
        let (child, state) = FakeChild::new(&names);
        self.states.lock().push((config.name.clone(), state));
        Ok(Box::new(child))
    }
}
