//! `agora install` — install a package (and its dependencies) from the
//! registry, or a stack from a local directory.

use anyhow::{Context, Result};
use clap::Args;

use crate::application::services::install::{
    install_from_local, install_package, InstallCtx, InstallOptions,
};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config_store::ConfigStore;
use crate::infra::paths::AgoraPaths;
use crate::infra::registry::RegistryClient;
use crate::output::{json, OutputContext};

#[derive(Args)]
pub struct InstallArgs {
    /// Package id (`kind:name`, or a bare stack name)
    pub id: Option<String>,

    /// Install a stack from a local directory instead of the registry
    #[arg(long, value_name = "DIR", conflicts_with = "id")]
    pub path: Option<std::path::PathBuf>,

    /// Reinstall even when already installed
    #[arg(long)]
    pub force: bool,

    /// Refresh the registry index before resolving
    #[arg(long)]
    pub refresh: bool,
}

pub async fn run(ctx: &OutputContext, json_output: bool, args: &InstallArgs) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let config = ConfigStore::new(&paths);

    if let Some(dir) = &args.path {
        let id = install_from_local(&paths, &config, dir)?;
        if json_output {
            return json::render(&serde_json::json!({
                "success": true,
                "id": id,
                "source": "local",
            }));
        }
        ctx.line(&format!("Installed {id} from {}", dir.display()));
        return Ok(());
    }

    let id = args
        .id
        .as_deref()
        .context("provide a package id or --path <dir>")?;

    let spinner = ctx
        .show_progress()
        .then(|| crate::output::progress::spinner("loading registry index"));
    let client = match RegistryClient::load(&paths, args.refresh) {
        Ok(client) => {
            if let Some(pb) = &spinner {
                crate::output::progress::finish_success(pb, "registry index loaded");
            }
            client
        }
        Err(e) => {
            if let Some(pb) = &spinner {
                crate::output::progress::finish_error(pb, "registry unavailable");
            }
            return Err(e);
        }
    };
    let runner = TokioCommandRunner::default();
    let install_ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: ctx,
    };

    let outcome = install_package(&install_ctx, id, InstallOptions { force: args.force }).await?;
    if json_output {
        return json::render(&serde_json::json!({
            "success": true,
            "id": outcome.id,
            "installed": outcome.installed,
            "alreadyInstalled": outcome.already_installed,
        }));
    }
    if outcome.already_installed {
        ctx.line(&format!("{} is already installed (use --force to reinstall)", outcome.id));
    }
    Ok(())
}
