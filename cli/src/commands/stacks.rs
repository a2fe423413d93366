//! `agora stacks` — stack-specific operations (tool indexing).

use anyhow::Result;
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use crate::application::services::tool_index::index_stacks;
use crate::infra::config_store::ConfigStore;
use crate::infra::mcp_client::McpProber;
use crate::infra::paths::AgoraPaths;
use crate::infra::secrets::FileSecretStore;
use crate::output::{json, OutputContext};

#[derive(Subcommand)]
pub enum StacksCommand {
    /// Launch installed stacks and index their MCP tools
    Index(IndexArgs),
}

#[derive(Args)]
pub struct IndexArgs {
    /// Only index this stack (id or name)
    #[arg(long)]
    pub stack: Option<String>,
}

pub async fn run(ctx: &OutputContext, json_output: bool, command: StacksCommand) -> Result<()> {
    match command {
        StacksCommand::Index(args) => index(ctx, json_output, &args).await,
    }
}

async fn index(ctx: &OutputContext, json_output: bool, args: &IndexArgs) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    paths.ensure_directories()?;
    let config = ConfigStore::new(&paths);
    let secrets = FileSecretStore::new(&paths);
    let prober = McpProber::new(&paths);

    let cache = index_stacks(
        &paths,
        &config,
        &secrets,
        &prober,
        ctx,
        args.stack.as_deref(),
    )
    .await?;

    if json_output {
        return json::render(&cache);
    }
    if cache.by_stack.is_empty() {
        ctx.line("No stacks installed.");
        return Ok(());
    }
    for (id, entry) in &cache.by_stack {
        match &entry.error {
            Some(error) => ctx.line(&format!(
                "{} {}",
                id.style(ctx.styles.bold),
                error.style(ctx.styles.error)
            )),
            None => {
                ctx.line(&format!(
                    "{} {} tools",
                    id.style(ctx.styles.bold),
                    entry.tools.len()
                ));
                for tool in &entry.tools {
                    ctx.line(&format!(
                        "  {} {}",
                        tool.name,
                        tool.description.style(ctx.styles.dim)
                    ));
                }
            }
        }
    }
    Ok(())
}
