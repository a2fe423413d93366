//! Application service — MCP tool indexing.
//!
//! Probes every installed stack sequentially (bounding memory and stdio
//! pressure), captures per-stack failures into the cache records instead
//! of propagating them, and writes the whole cache atomically when done.
//! Stacks with unconfigured required secrets are never spawned.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::ports::{ProgressReporter, SecretStore, StackProber};
use crate::domain::config::{AgoraConfig, CachedTool, StackConfig};
use crate::infra::config_store::ConfigStore;
use crate::infra::download::now_iso;
use crate::infra::paths::AgoraPaths;

/// Cache document version.
pub const CACHE_VERSION: u32 = 1;

/// The tool index cache (`cache/tool-index.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolIndexCache {
    pub version: u32,
    pub updated_at: String,
    pub by_stack: BTreeMap<String, StackToolEntry>,
}

impl Default for ToolIndexCache {
    fn default() -> Self {
        Self { version: CACHE_VERSION, updated_at: String::new(), by_stack: BTreeMap::new() }
    }
}

/// One stack's cached inventory. Stale entries simply carry an old
/// `indexedAt`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackToolEntry {
    pub indexed_at: String,
    pub tools: Vec<CachedTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_secrets: Option<Vec<String>>,
}

/// Probe installed stacks (optionally a single one) and rebuild the cache.
/// Entries for stacks not probed in this run are preserved.
///
/// # Errors
///
/// Returns an error for config or cache I/O failures; per-stack probe
/// failures land in the cache records.
pub async fn index_stacks(
    paths: &AgoraPaths,
    config: &ConfigStore,
    secrets: &impl SecretStore,
    prober: &impl StackProber,
    reporter: &impl ProgressReporter,
    only: Option<&str>,
) -> Result<ToolIndexCache> {
    let cfg = config.read()?;
    let mut cache = read_cache(paths)?;

    for (id, stack) in &cfg.stacks {
        if only.is_some_and(|want| want != id && want != stack.name) {
            continue;
        }
        reporter.step(&format!("indexing {id}..."));
        let entry = probe_stack(&cfg, stack, id, secrets, prober).await?;

        match &entry.error {
            Some(error) => reporter.warn(&format!("{id}: {error}")),
            None => reporter.success(&format!("{id}: {} tools", entry.tools.len())),
        }
        if entry.error.is_none() {
            config.update_stack_tools(id, entry.tools.clone())?;
        }
        cache.by_stack.insert(id.clone(), entry);
    }

    cache.updated_at = now_iso();
    write_cache(paths, &cache)?;
    Ok(cache)
}

async fn probe_stack(
    cfg: &AgoraConfig,
    stack: &StackConfig,
    id: &str,
    secrets: &impl SecretStore,
    prober: &impl StackProber,
) -> Result<StackToolEntry> {
    // Required secrets must be configured before a spawn is attempted.
    let mut missing = Vec::new();
    let mut env = BTreeMap::new();
    for requirement in &stack.secrets {
        let configured = cfg
            .secrets
            .get(&requirement.name)
            .map(|meta| meta.configured)
            .unwrap_or(false);
        let value = if configured { secrets.get(&requirement.name)? } else { None };
        match value {
            Some(value) => {
                env.insert(requirement.name.clone(), value);
            }
            None if requirement.required => missing.push(requirement.name.clone()),
            None => {}
        }
    }
    if !missing.is_empty() {
        return Ok(StackToolEntry {
            indexed_at: now_iso(),
            tools: Vec::new(),
            error: Some(format!("Missing required secrets: {}", missing.join(", "))),
            missing_secrets: Some(missing),
        });
    }

    let entry = match prober.probe(id, &stack.launch, &env).await {
        Ok(tools) => StackToolEntry {
            indexed_at: now_iso(),
            tools,
            error: None,
            missing_secrets: None,
        },
        Err(e) => StackToolEntry {
            indexed_at: now_iso(),
            tools: Vec::new(),
            error: Some(e.to_string()),
            missing_secrets: None,
        },
    };
    Ok(entry)
}

// ── Cache I/O ────────────────────────────────────────────────────────────────

/// Read the existing cache, defaulting to an empty one.
///
/// # Errors
///
/// Returns an error for unreadable or malformed cache files.
pub fn read_cache(paths: &AgoraPaths) -> Result<ToolIndexCache> {
    let path = paths.tool_index_cache();
    if !path.is_file() {
        return Ok(ToolIndexCache::default());
    }
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Atomic replace: temp file (0600) then rename.
fn write_cache(paths: &AgoraPaths, cache: &ToolIndexCache) -> Result<()> {
    let path = paths.tool_index_cache();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(cache).context("serializing tool cache")?;
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, text).with_context(|| format!("writing {}", temp.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", temp.display()))?;
    }
    std::fs::rename(&temp, &path).with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
