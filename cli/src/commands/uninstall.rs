//! `agora uninstall` — remove a package, its lockfile, and its config
//! entry.

use anyhow::Result;
use clap::Args;

use crate::application::services::install::uninstall_package;
use crate::infra::config_store::ConfigStore;
use crate::infra::paths::AgoraPaths;
use crate::output::{json, OutputContext};

#[derive(Args)]
pub struct UninstallArgs {
    /// Package id (`kind:name`, or a bare stack name)
    pub id: String,
}

pub fn run(ctx: &OutputContext, json_output: bool, args: &UninstallArgs) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let config = ConfigStore::new(&paths);
    uninstall_package(&paths, &config, &args.id)?;

    if json_output {
        return json::render(&serde_json::json!({"success": true, "id": args.id}));
    }
    ctx.line(&format!("Uninstalled {}", args.id));
    Ok(())
}
