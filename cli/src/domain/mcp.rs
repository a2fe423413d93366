//! MCP server entries for third-party agent configs.
//!
//! Pure construction of the `{command, args, cwd, env, type}` object an
//! agent config stores per stack, including the path-resolution rule for
//! relative arguments and the compiled-entry rewrite that swaps an
//! `npx tsx src/X.ts` launch for `node dist/X.js` when the compiled file
//! exists (a ~5x startup-time win). Filesystem existence is injected so the
//! logic stays testable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agora_common::StackManifest;

use crate::domain::launch::bundled_runtime_bin;

/// One MCP server entry as written into an agent config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub cwd: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// `"stdio"` for the Anthropic agent family, absent elsewhere.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
}

/// Build the MCP entry for a stack, or `None` when the manifest declares no
/// launchable command (the registrar then skips the stack silently).
///
/// `exists` answers whether a path is present on disk; it gates the
/// compiled-entry rewrite.
#[must_use]
pub fn build_mcp_config(
    manifest: &StackManifest,
    install_path: &Path,
    runtimes_dir: &Path,
    exists: &dyn Fn(&Path) -> bool,
) -> Option<McpServerConfig> {
    let mut command: Vec<String> = if !manifest.command.is_empty() {
        manifest.command.clone()
    } else if let Some(mcp) = &manifest.mcp {
        let mut v = vec![mcp.command.clone()];
        v.extend(mcp.args.iter().cloned());
        if let Some(entry) = &mcp.entry {
            v.push(entry.clone());
        }
        v
    } else {
        return None;
    };
    if command.is_empty() || command[0].is_empty() {
        return None;
    }

    if let Some(rewritten) = compiled_entry(&command, install_path, exists) {
        command = rewritten;
    }

    let bin = resolve_bin(&command[0], runtimes_dir);
    let args = command[1..]
        .iter()
        .map(|arg| resolve_arg(arg, install_path))
        .collect();

    Some(McpServerConfig {
        command: bin,
        args,
        cwd: install_path.to_string_lossy().to_string(),
        env: BTreeMap::new(),
        transport: None,
    })
}

/// When the launch is `npx ... tsx ... <src>.ts`, look for the compiled
/// sibling (`src/X.ts` → `dist/X.js`); if it exists, launch that under
/// `node` instead.
fn compiled_entry(
    command: &[String],
    install_path: &Path,
    exists: &dyn Fn(&Path) -> bool,
) -> Option<Vec<String>> {
    if command[0] != "npx" || !command.iter().any(|a| a == "tsx") {
        return None;
    }
    let source = command.iter().find(|a| a.ends_with(".ts"))?;
    let relative = source.trim_start_matches("./");
    let compiled = relative
        .replacen("src/", "dist/", 1)
        .trim_end_matches(".ts")
        .to_string()
        + ".js";
    let candidate = install_path.join(&compiled);
    if exists(&candidate) {
        Some(vec![
            "node".to_string(),
            candidate.to_string_lossy().to_string(),
        ])
    } else {
        None
    }
}

/// Map well-known interpreter names onto the bundled runtime binaries.
fn resolve_bin(bin: &str, runtimes_dir: &Path) -> String {
    match bin {
        "node" => bundled_runtime_bin(runtimes_dir, "node", "node"),
        "python" | "python3" => bundled_runtime_bin(runtimes_dir, "python", "python3"),
        "npx" => bundled_runtime_bin(runtimes_dir, "node", "npx"),
        other => return other.to_string(),
    }
    .to_string_lossy()
    .to_string()
}

/// Rewrite a relative, path-like argument absolute against the install
/// directory. Flags and bare words pass through.
fn resolve_arg(arg: &str, install_path: &Path) -> String {
    if looks_path_like(arg) && !Path::new(arg).is_absolute() {
        install_path.join(arg).to_string_lossy().to_string()
    } else {
        arg.to_string()
    }
}

fn looks_path_like(arg: &str) -> bool {
    arg.starts_with('.') || arg.contains('/') || arg.contains('\\')
}

// ── .env parsing ─────────────────────────────────────────────────────────────

/// Parse a stack's `.env` file: `KEY=VAL` lines, optional single or double
/// quoting, `#` comments. Empty values are dropped — they would only mask
/// inherited environment.
#[must_use]
pub fn parse_env_file(text: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        if !value.is_empty() {
            env.insert(key.to_string(), value.to_string());
        }
    }
    env
}

/// The absolute `.env` path for a stack install directory.
#[must_use]
pub fn env_file_path(install_path: &Path) -> PathBuf {
    install_path.join(".env")
}

// ── Unit tests ───────────────────────────────────────────────────────────────
