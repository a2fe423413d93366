//! `agora update` — reinstall one package (or everything) at the latest
//! registry state.

use anyhow::Result;
use clap::Args;

use crate::application::services::install::{update_all, update_package, InstallCtx};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config_store::ConfigStore;
use crate::infra::paths::AgoraPaths;
use crate::infra::registry::RegistryClient;
use crate::output::{json, OutputContext};

#[derive(Args)]
pub struct UpdateArgs {
    /// Package id; all installed packages when omitted
    pub id: Option<String>,
}

pub async fn run(ctx: &OutputContext, json_output: bool, args: &UpdateArgs) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let config = ConfigStore::new(&paths);
    let client = RegistryClient::load(&paths, true)?;
    let runner = TokioCommandRunner::default();
    let install_ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: ctx,
    };

    match &args.id {
        Some(id) => {
            let outcome = update_package(&install_ctx, id).await?;
            if json_output {
                json::render(&serde_json::json!({"success": true, "id": outcome.id}))?;
            }
        }
        None => {
            let results = update_all(&install_ctx).await;
            let summary: Vec<serde_json::Value> = results
                .iter()
                .map(|(id, result)| match result {
                    Ok(_) => serde_json::json!({"id": id, "success": true}),
                    Err(e) => serde_json::json!({
                        "id": id,
                        "success": false,
                        "error": e.to_string(),
                    }),
                })
                .collect();
            if json_output {
                json::render(&serde_json::json!({"results": summary}))?;
            } else {
                let failures = results.iter().filter(|(_, r)| r.is_err()).count();
                ctx.line(&format!(
                    "Updated {} packages, {failures} failed",
                    results.len() - failures
                ));
            }
        }
    }
    Ok(())
}
