//! `agora search` — case-insensitive registry search.

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use agora_common::PackageKind;

use crate::infra::paths::AgoraPaths;
use crate::infra::registry::RegistryClient;
use crate::output::{json, OutputContext};

#[derive(Args)]
pub struct SearchArgs {
    /// Substring matched against id, name, description, and tags
    pub query: String,

    /// Restrict to one kind (stack, prompt, runtime, binary, agent)
    #[arg(long)]
    pub kind: Option<String>,

    /// Refresh the registry index first
    #[arg(long)]
    pub refresh: bool,
}

pub fn run(ctx: &OutputContext, json_output: bool, args: &SearchArgs) -> Result<()> {
    let kind = match &args.kind {
        Some(k) => Some(
            PackageKind::parse(k)
                .ok_or_else(|| agora_common::PackageError::InvalidPackageId(k.clone()))?,
        ),
        None => None,
    };

    let paths = AgoraPaths::resolve()?;
    let client = RegistryClient::load(&paths, args.refresh)?;
    let hits = client.search(&args.query, kind);

    if json_output {
        return json::render(&serde_json::json!({"results": hits}));
    }

    if hits.is_empty() {
        ctx.line(&format!("No packages match '{}'", args.query));
        return Ok(());
    }
    for hit in hits {
        ctx.line(&format!(
            "{} {}  {}",
            format!("{}:", hit.kind).style(ctx.styles.dim),
            hit.descriptor.name.style(ctx.styles.bold),
            hit.descriptor.description.as_deref().unwrap_or_default(),
        ));
    }
    Ok(())
}
