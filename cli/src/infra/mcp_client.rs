//! Line-framed JSON-RPC 2.0 client for MCP stacks over stdio.
//!
//! Spawns a stack subprocess, performs the `initialize` /
//! `notifications/initialized` / `tools/list` handshake, and normalises the
//! reported tools. Requests carry integer ids starting at 1; responses are
//! matched through a small pending table, and any server-initiated message
//! without a matching id is ignored. A watchdog kills the child after the
//! probe timeout.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

use crate::application::ports::StackProber;
use crate::domain::config::CachedTool;
use crate::domain::error::StackError;
use crate::domain::launch::LaunchConfig;
use crate::infra::paths::AgoraPaths;

/// Fixed MCP protocol version string sent in `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Watchdog timeout per stack probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Production `StackProber` that launches real subprocesses.
pub struct McpProber {
    paths: AgoraPaths,
    timeout: Duration,
}

impl McpProber {
    #[must_use]
    pub fn new(paths: &AgoraPaths) -> Self {
        Self { paths: paths.clone(), timeout: PROBE_TIMEOUT }
    }

    #[must_use]
    pub fn with_timeout(paths: &AgoraPaths, timeout: Duration) -> Self {
        Self { paths: paths.clone(), timeout }
    }

    async fn handshake(
        &self,
        stack_id: &str,
        launch: &LaunchConfig,
        env: &BTreeMap<String, String>,
    ) -> Result<Vec<CachedTool>> {
        if !Path::new(&launch.bin).is_file() {
            return Err(StackError::SpawnError {
                id: stack_id.to_string(),
                cause: format!("launch binary not found: {}", launch.bin),
            }
            .into());
        }

        let mut command = tokio::process::Command::new(&launch.bin);
        command
            .args(&launch.args)
            .current_dir(&launch.cwd)
            .envs(env)
            .env("PATH", self.path_with_runtimes())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| StackError::SpawnError {
            id: stack_id.to_string(),
            cause: e.to_string(),
        })?;

        let stdin = child.stdin.take().context("stack stdin not piped")?;
        let stdout = child.stdout.take().context("stack stdout not piped")?;
        let mut client = JsonRpcClient::new(stdin, stdout);

        client
            .request(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "agora",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        client.notify("notifications/initialized", json!({})).await?;
        let result = client.request("tools/list", json!({})).await?;

        shutdown(&mut child).await;
        Ok(normalise_tools(&result))
    }

    /// Parent `PATH` with every bundled runtime `bin/` directory prepended.
    fn path_with_runtimes(&self) -> std::ffi::OsString {
        let mut entries: Vec<std::path::PathBuf> = Vec::new();
        if let Ok(dir) = std::fs::read_dir(self.paths.runtimes()) {
            let mut runtime_bins: Vec<_> = dir
                .flatten()
                .map(|e| e.path().join("bin"))
                .filter(|p| p.is_dir())
                .collect();
            runtime_bins.sort();
            entries.extend(runtime_bins);
        }
        if let Some(path) = std::env::var_os("PATH") {
            entries.extend(std::env::split_paths(&path));
        }
        std::env::join_paths(entries).unwrap_or_else(|_| std::ffi::OsString::from(""))
    }
}

impl StackProber for McpProber {
    async fn probe(
        &self,
        stack_id: &str,
        launch: &LaunchConfig,
        env: &BTreeMap<String, String>,
    ) -> Result<Vec<CachedTool>> {
        match tokio::time::timeout(self.timeout, self.handshake(stack_id, launch, env)).await {
            Ok(result) => result,
            // kill_on_drop reaps the child when the handshake future drops.
            Err(_) => Err(StackError::Timeout {
                id: stack_id.to_string(),
                ms: self.timeout.as_millis() as u64,
            }
            .into()),
        }
    }
}

async fn shutdown(child: &mut Child) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}

// ── JSON-RPC plumbing ────────────────────────────────────────────────────────

/// Minimal line-framed JSON-RPC 2.0 client over a child's stdio.
struct JsonRpcClient {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: i64,
    pending: HashMap<i64, JsonValue>,
}

impl JsonRpcClient {
    fn new(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            stdin,
            lines: BufReader::new(stdout).lines(),
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    async fn send(&mut self, message: &JsonValue) -> Result<()> {
        let mut line = serde_json::to_string(message).context("encoding request")?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .context("writing to stack stdin")?;
        self.stdin.flush().await.context("flushing stack stdin")?;
        Ok(())
    }

    /// Send a request and await the response with the matching id. Replies
    /// to other requests are parked in the pending table; notifications and
    /// unparseable lines are skipped.
    async fn request(&mut self, method: &str, params: JsonValue) -> Result<JsonValue> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        loop {
            if let Some(message) = self.pending.remove(&id) {
                return extract_result(method, &message);
            }
            let line = self
                .lines
                .next_line()
                .await
                .context("reading from stack stdout")?
                .with_context(|| format!("stack closed stdout before replying to {method}"))?;
            let Ok(message) = serde_json::from_str::<JsonValue>(&line) else {
                continue;
            };
            match message.get("id").and_then(JsonValue::as_i64) {
                Some(msg_id) if msg_id == id => return extract_result(method, &message),
                Some(msg_id) => {
                    self.pending.insert(msg_id, message);
                }
                // Server-initiated notification; not ours to answer.
                None => {}
            }
        }
    }

    async fn notify(&mut self, method: &str, params: JsonValue) -> Result<()> {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }
}

fn extract_result(method: &str, message: &JsonValue) -> Result<JsonValue> {
    if let Some(error) = message.get("error") {
        anyhow::bail!(
            "{method} failed: {}",
            error.get("message").and_then(JsonValue::as_str).unwrap_or("unknown error")
        );
    }
    Ok(message.get("result").cloned().unwrap_or(JsonValue::Null))
}

// ── Tool normalisation ───────────────────────────────────────────────────────

/// Normalise a `tools/list` result: description falls back to the tool
/// name, the input schema to an empty object schema.
#[must_use]
pub fn normalise_tools(result: &JsonValue) -> Vec<CachedTool> {
    let Some(tools) = result.get("tools").and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    tools
        .iter()
        .filter_map(|tool| {
            let name = tool.get("name").and_then(JsonValue::as_str)?.to_string();
            let description = tool
                .get("description")
                .and_then(JsonValue::as_str)
                .filter(|d| !d.is_empty())
                .unwrap_or(&name)
                .to_string();
            let input_schema = tool
                .get("inputSchema")
                .cloned()
                .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
            Some(CachedTool { name, description, input_schema })
        })
        .collect()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
