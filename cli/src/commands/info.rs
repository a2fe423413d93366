//! `agora info` — descriptor and install state of one package.

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use crate::application::ports::PackageSource;
use crate::domain::error::InstallError;
use crate::infra::paths::AgoraPaths;
use crate::infra::registry::RegistryClient;
use crate::output::{json, OutputContext};

#[derive(Args)]
pub struct InfoArgs {
    /// Package id (`kind:name`, or a bare name searched across kinds)
    pub id: String,
}

pub fn run(ctx: &OutputContext, json_output: bool, args: &InfoArgs) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let client = RegistryClient::load(&paths, false)?;
    let found = client
        .get_package(&args.id)?
        .ok_or_else(|| InstallError::PackageNotFound(args.id.clone()))?;

    let name = agora_common::package::strip_kind_prefix(&found.descriptor.id);
    let installed = paths.is_installed(found.kind, name);

    if json_output {
        return json::render(&serde_json::json!({
            "kind": found.kind,
            "installed": installed,
            "descriptor": found.descriptor,
        }));
    }

    ctx.line(&format!(
        "{} {}",
        found.descriptor.name.style(ctx.styles.header),
        found.descriptor.version.as_deref().unwrap_or("").style(ctx.styles.dim)
    ));
    if let Some(description) = &found.descriptor.description {
        ctx.line(description);
    }
    ctx.line(&format!("kind: {}", found.kind));
    ctx.line(&format!("installed: {installed}"));
    if let Some(requires) = &found.descriptor.requires {
        let deps: Vec<String> = requires
            .entries()
            .into_iter()
            .map(|(kind, name)| format!("{kind}:{name}"))
            .collect();
        if !deps.is_empty() {
            ctx.line(&format!("requires: {}", deps.join(", ")));
        }
    }
    Ok(())
}
