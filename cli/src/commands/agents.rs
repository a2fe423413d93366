//! `agora agents` — agent detection and MCP registration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use agora_common::{PackageId, PackageKind, StackManifest};

use crate::application::services::registrar::{
    register_mcp_all, registration_summary, unregister_mcp_all,
};
use crate::infra::agents::AGENTS;
use crate::infra::paths::AgoraPaths;
use crate::output::{json, OutputContext};

#[derive(Subcommand)]
pub enum AgentsCommand {
    /// Show which supported agents are installed
    List,
    /// Register a stack as an MCP server in agent configs
    Register(RegisterArgs),
    /// Remove a stack from agent configs
    Unregister(RegisterArgs),
    /// Show current registrations across agents
    Status(StatusArgs),
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Stack id (`stack:name` or bare name)
    pub stack: String,

    /// Restrict to specific agents (repeatable)
    #[arg(long = "agent")]
    pub agents: Vec<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Only show registrations of this stack
    #[arg(long)]
    pub stack: Option<String>,
}

/// Third-party agent config files live under the real home directory, not
/// the agora home. Overridable for tests.
fn agent_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("AGORA_AGENT_HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir().context("cannot determine home directory")
}

pub fn run(ctx: &OutputContext, json_output: bool, command: AgentsCommand) -> Result<()> {
    match command {
        AgentsCommand::List => list(ctx, json_output),
        AgentsCommand::Register(args) => register(ctx, json_output, &args, true),
        AgentsCommand::Unregister(args) => register(ctx, json_output, &args, false),
        AgentsCommand::Status(args) => status(ctx, json_output, &args),
    }
}

fn list(ctx: &OutputContext, json_output: bool) -> Result<()> {
    let home = agent_home()?;
    let detected: Vec<serde_json::Value> = AGENTS
        .iter()
        .map(|spec| {
            let path = spec.config_path(&home);
            serde_json::json!({
                "id": spec.id,
                "name": spec.name,
                "installed": path.is_some(),
                "configPath": path.map(|p| p.to_string_lossy().to_string()),
            })
        })
        .collect();

    if json_output {
        return json::render(&serde_json::json!({"agents": detected}));
    }
    for agent in &detected {
        let installed = agent["installed"].as_bool().unwrap_or(false);
        let marker = if installed { "✓" } else { "·" };
        ctx.line(&format!(
            "{marker} {} {}",
            agent["name"].as_str().unwrap_or_default().style(ctx.styles.bold),
            agent["configPath"].as_str().unwrap_or("not installed").style(ctx.styles.dim),
        ));
    }
    Ok(())
}

fn register(
    ctx: &OutputContext,
    json_output: bool,
    args: &RegisterArgs,
    add: bool,
) -> Result<()> {
    let home = agent_home()?;
    let targets = (!args.agents.is_empty()).then_some(args.agents.as_slice());

    let results = if add {
        let paths = AgoraPaths::resolve()?;
        let id = PackageId::parse(&args.stack)?;
        let install_path = paths.install_dir(PackageKind::Stack, &id.name);
        let manifest_path = install_path.join("manifest.json");
        let text = std::fs::read_to_string(&manifest_path).with_context(|| {
            format!("stack '{}' is not installed (no {})", args.stack, manifest_path.display())
        })?;
        let manifest = StackManifest::parse(&manifest_path.to_string_lossy(), &text)?;
        register_mcp_all(&paths, &home, &id.to_string(), &install_path, &manifest, targets)
    } else {
        unregister_mcp_all(&home, &args.stack, targets)
    };

    if json_output {
        return json::render(&serde_json::json!({"results": results}));
    }
    for (agent_id, result) in &results {
        if result.success {
            ctx.line(&format!(
                "{} {}",
                "✓".style(ctx.styles.success),
                agent_id.style(ctx.styles.bold)
            ));
        } else if result.skipped {
            ctx.line(&format!(
                "· {agent_id} {}",
                result.reason.as_deref().unwrap_or_default().style(ctx.styles.dim)
            ));
        } else {
            ctx.line(&format!(
                "{} {agent_id} {}",
                "✗".style(ctx.styles.error),
                result.error.as_deref().unwrap_or_default()
            ));
        }
    }
    Ok(())
}

fn status(ctx: &OutputContext, json_output: bool, args: &StatusArgs) -> Result<()> {
    let home = agent_home()?;
    let summary = registration_summary(&home, args.stack.as_deref());

    if json_output {
        return json::render(&serde_json::json!({"registrations": summary}));
    }
    if summary.is_empty() {
        ctx.line("No supported agents installed.");
        return Ok(());
    }
    for (agent_id, stacks) in &summary {
        ctx.line(&format!(
            "{}: {}",
            agent_id.style(ctx.styles.bold),
            if stacks.is_empty() { "-".to_string() } else { stacks.join(", ") }
        ));
    }
    Ok(())
}
