//! Application service — registering stacks into agent configs.
//!
//! Iterates the fixed agent table, writing or removing the stack's MCP
//! entry in each installed agent's config. One agent's failure never
//! prevents the others from succeeding; the caller gets a per-agent result
//! map. The registrar does not take the central config lock — these files
//! belong to the agents.

use std::collections::BTreeMap;
use std::path::Path;

use agora_common::package::strip_kind_prefix;
use agora_common::StackManifest;

use crate::domain::mcp::{build_mcp_config, parse_env_file};
use crate::infra::agents::{self, AgentSpec, AGENTS};
use crate::infra::paths::AgoraPaths;

/// Outcome for one agent.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationResult {
    fn skipped(reason: &str) -> Self {
        Self { skipped: true, reason: Some(reason.to_string()), ..Self::default() }
    }
}

fn targeted<'a>(target_agents: Option<&'a [String]>) -> impl Iterator<Item = &'static AgentSpec> + 'a {
    AGENTS
        .iter()
        .filter(move |spec| target_agents.map_or(true, |targets| targets.iter().any(|t| t == spec.id)))
}

/// Register a stack's MCP entry with every installed agent.
///
/// Returns `{agentId -> result}`. A stack whose manifest declares no
/// launchable command skips every agent.
#[must_use]
pub fn register_mcp_all(
    paths: &AgoraPaths,
    home: &Path,
    stack_id: &str,
    install_path: &Path,
    manifest: &StackManifest,
    target_agents: Option<&[String]>,
) -> BTreeMap<String, RegistrationResult> {
    let mut results = BTreeMap::new();
    let stack_key = strip_kind_prefix(stack_id).to_string();

    let Some(mut entry) =
        build_mcp_config(manifest, install_path, &paths.runtimes(), &|p| p.exists())
    else {
        for spec in targeted(target_agents) {
            results.insert(
                spec.id.to_string(),
                RegistrationResult::skipped("Stack declares no MCP command"),
            );
        }
        return results;
    };

    // Non-empty values from the stack's .env become the entry environment.
    if let Ok(text) = std::fs::read_to_string(install_path.join(".env")) {
        entry.env = parse_env_file(&text);
    }

    for spec in targeted(target_agents) {
        let result = match spec.config_path(home) {
            None => RegistrationResult::skipped("Agent not installed"),
            Some(config_path) => match agents::upsert_entry(spec, &config_path, &stack_key, &entry)
            {
                Ok(()) => RegistrationResult {
                    success: true,
                    config_path: Some(config_path.to_string_lossy().to_string()),
                    ..RegistrationResult::default()
                },
                Err(e) => RegistrationResult {
                    error: Some(e.to_string()),
                    ..RegistrationResult::default()
                },
            },
        };
        results.insert(spec.id.to_string(), result);
    }
    results
}

/// Remove a stack's MCP entry from every installed agent. A missing entry
/// is a skip, not a failure.
#[must_use]
pub fn unregister_mcp_all(
    home: &Path,
    stack_id: &str,
    target_agents: Option<&[String]>,
) -> BTreeMap<String, RegistrationResult> {
    let mut results = BTreeMap::new();
    let stack_key = strip_kind_prefix(stack_id).to_string();

    for spec in targeted(target_agents) {
        let result = match spec.config_path(home) {
            None => RegistrationResult::skipped("Agent not installed"),
            Some(config_path) => match agents::remove_entry(spec, &config_path, &stack_key) {
                Ok(true) => RegistrationResult {
                    success: true,
                    config_path: Some(config_path.to_string_lossy().to_string()),
                    ..RegistrationResult::default()
                },
                Ok(false) => RegistrationResult::skipped("Not registered"),
                Err(e) => RegistrationResult {
                    error: Some(e.to_string()),
                    ..RegistrationResult::default()
                },
            },
        };
        results.insert(spec.id.to_string(), result);
    }
    results
}

/// Snapshot of current registrations across all agents, read-only.
/// With `stack_id` set, only that stack's entries are reported.
#[must_use]
pub fn registration_summary(
    home: &Path,
    stack_id: Option<&str>,
) -> BTreeMap<String, Vec<String>> {
    let wanted = stack_id.map(|id| strip_kind_prefix(id).to_string());
    let mut summary = BTreeMap::new();
    for spec in &AGENTS {
        let Some(config_path) = spec.config_path(home) else { continue };
        let Ok(mut entries) = agents::list_entries(spec, &config_path) else { continue };
        if let Some(wanted) = &wanted {
            entries.retain(|e| e == wanted);
        }
        summary.insert(spec.id.to_string(), entries);
    }
    summary
}

// ── Unit tests ───────────────────────────────────────────────────────────────
