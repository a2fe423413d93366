//! Third-party agent table and config-file editing.
//!
//! A fixed table of nine agent clients, each with a stable id, the JSON key
//! it stores MCP servers under, and per-OS candidate config paths. An agent
//! is "installed" iff its first existing candidate path resolves. All
//! configs are JSON except Codex CLI, which uses TOML. Unknown fields in
//! agent configs are preserved verbatim — these files belong to the agents,
//! not to agora.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use crate::domain::mcp::McpServerConfig;
use crate::infra::toml_config;

/// On-disk format of an agent's config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// One supported agent client.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub id: &'static str,
    pub name: &'static str,
    /// Key the agent stores MCP servers under.
    pub key: &'static str,
    pub format: ConfigFormat,
    /// Anthropic's agents additionally want `type: "stdio"` per entry.
    pub anthropic: bool,
}

/// The fixed agent table.
pub static AGENTS: [AgentSpec; 9] = [
    AgentSpec {
        id: "claude-desktop",
        name: "Claude Desktop",
        key: "mcpServers",
        format: ConfigFormat::Json,
        anthropic: true,
    },
    AgentSpec {
        id: "claude-code",
        name: "Claude Code",
        key: "mcpServers",
        format: ConfigFormat::Json,
        anthropic: true,
    },
    AgentSpec {
        id: "cursor",
        name: "Cursor",
        key: "mcpServers",
        format: ConfigFormat::Json,
        anthropic: false,
    },
    AgentSpec {
        id: "windsurf",
        name: "Windsurf",
        key: "mcpServers",
        format: ConfigFormat::Json,
        anthropic: false,
    },
    AgentSpec {
        id: "cline",
        name: "Cline",
        key: "mcpServers",
        format: ConfigFormat::Json,
        anthropic: false,
    },
    AgentSpec {
        id: "zed",
        name: "Zed",
        key: "context_servers",
        format: ConfigFormat::Json,
        anthropic: false,
    },
    AgentSpec {
        id: "vscode",
        name: "VS Code (Copilot)",
        key: "servers",
        format: ConfigFormat::Json,
        anthropic: false,
    },
    AgentSpec {
        id: "gemini-cli",
        name: "Gemini CLI",
        key: "mcpServers",
        format: ConfigFormat::Json,
        anthropic: false,
    },
    AgentSpec {
        id: "codex",
        name: "Codex CLI",
        key: "mcp_servers",
        format: ConfigFormat::Toml,
        anthropic: false,
    },
];

/// Look up an agent by id.
#[must_use]
pub fn agent_by_id(id: &str) -> Option<&'static AgentSpec> {
    AGENTS.iter().find(|a| a.id == id)
}

impl AgentSpec {
    /// Candidate config paths for the current OS, most specific first.
    #[must_use]
    pub fn candidate_paths(&self, home: &Path) -> Vec<PathBuf> {
        let os = std::env::consts::OS;
        let app_support = match os {
            "macos" => home.join("Library/Application Support"),
            "windows" => home.join("AppData/Roaming"),
            _ => home.join(".config"),
        };
        match self.id {
            "claude-desktop" => vec![app_support.join("Claude/claude_desktop_config.json")],
            "claude-code" => vec![home.join(".claude.json")],
            "cursor" => vec![home.join(".cursor/mcp.json")],
            "windsurf" => vec![home.join(".codeium/windsurf/mcp_config.json")],
            "cline" => vec![app_support.join(
                "Code/User/globalStorage/saoudrizwan.claude-dev/settings/cline_mcp_settings.json",
            )],
            "zed" => vec![home.join(".config/zed/settings.json")],
            "vscode" => vec![app_support.join("Code/User/mcp.json")],
            "gemini-cli" => vec![home.join(".gemini/settings.json")],
            "codex" => vec![home.join(".codex/config.toml")],
            _ => Vec::new(),
        }
    }

    /// The first existing candidate path, i.e. whether the agent is
    /// installed.
    #[must_use]
    pub fn config_path(&self, home: &Path) -> Option<PathBuf> {
        self.candidate_paths(home).into_iter().find(|p| p.is_file())
    }
}

// ── Config editing ───────────────────────────────────────────────────────────

/// Insert-or-replace a stack's MCP entry in an agent config.
///
/// # Errors
///
/// Returns an error if the config cannot be read, parsed, or written.
pub fn upsert_entry(
    spec: &AgentSpec,
    config_path: &Path,
    stack_key: &str,
    entry: &McpServerConfig,
) -> Result<()> {
    let mut entry = entry.clone();
    if spec.anthropic {
        entry.transport = Some("stdio".to_string());
    }
    let entry_json = serde_json::to_value(&entry).context("serializing MCP entry")?;

    match spec.format {
        ConfigFormat::Json => {
            let mut config = read_json(config_path)?;
            let root = config
                .as_object_mut()
                .with_context(|| format!("{} is not a JSON object", config_path.display()))?;
            let servers = root
                .entry(spec.key.to_string())
                .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
            let servers = servers
                .as_object_mut()
                .with_context(|| format!("'{}' is not an object", spec.key))?;
            servers.insert(stack_key.to_string(), entry_json);
            write_json(config_path, &config)
        }
        ConfigFormat::Toml => {
            let mut table = read_toml(config_path)?;
            let servers = table
                .entry(spec.key.to_string())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
            let servers = servers
                .as_table_mut()
                .with_context(|| format!("'{}' is not a table", spec.key))?;
            servers.insert(stack_key.to_string(), toml_config::json_to_toml(&entry_json));
            write_toml(config_path, &table)
        }
    }
}

/// Remove a stack's MCP entry. `Ok(false)` when the key was absent.
///
/// # Errors
///
/// Returns an error if the config cannot be read, parsed, or written.
pub fn remove_entry(spec: &AgentSpec, config_path: &Path, stack_key: &str) -> Result<bool> {
    match spec.format {
        ConfigFormat::Json => {
            let mut config = read_json(config_path)?;
            let removed = config
                .get_mut(spec.key)
                .and_then(JsonValue::as_object_mut)
                .and_then(|servers| servers.remove(stack_key))
                .is_some();
            if removed {
                write_json(config_path, &config)?;
            }
            Ok(removed)
        }
        ConfigFormat::Toml => {
            let mut table = read_toml(config_path)?;
            let removed = table
                .get_mut(spec.key)
                .and_then(toml::Value::as_table_mut)
                .and_then(|servers| servers.remove(stack_key))
                .is_some();
            if removed {
                write_toml(config_path, &table)?;
            }
            Ok(removed)
        }
    }
}

/// Stack keys currently registered in an agent config.
///
/// # Errors
///
/// Returns an error if the config cannot be read or parsed.
pub fn list_entries(spec: &AgentSpec, config_path: &Path) -> Result<Vec<String>> {
    match spec.format {
        ConfigFormat::Json => {
            let config = read_json(config_path)?;
            Ok(config
                .get(spec.key)
                .and_then(JsonValue::as_object)
                .map(|servers| servers.keys().cloned().collect())
                .unwrap_or_default())
        }
        ConfigFormat::Toml => {
            let table = read_toml(config_path)?;
            Ok(table
                .get(spec.key)
                .and_then(toml::Value::as_table)
                .map(|servers| servers.keys().cloned().collect())
                .unwrap_or_default())
        }
    }
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(JsonValue::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json(path: &Path, config: &JsonValue) -> Result<()> {
    let mut text = serde_json::to_string_pretty(config).context("serializing agent config")?;
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn read_toml(path: &Path) -> Result<toml::value::Table> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml_config::parse(&text)
}

fn write_toml(path: &Path, table: &toml::value::Table) -> Result<()> {
    std::fs::write(path, toml_config::write(table))
        .with_context(|| format!("writing {}", path.display()))
}

// ── Unit tests ───────────────────────────────────────────────────────────────
