//! `agora config` — central config inspection and secret management.

use anyhow::Result;
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use crate::application::ports::SecretStore as _;
use crate::infra::config_store::ConfigStore;
use crate::infra::paths::AgoraPaths;
use crate::infra::secrets::FileSecretStore;
use crate::output::{json, OutputContext};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the central config document
    Show,
    /// List declared secrets and whether they are configured
    Secrets,
    /// Store a secret value and mark it configured
    SetSecret(SetSecretArgs),
}

#[derive(Args)]
pub struct SetSecretArgs {
    /// Secret name (e.g. GITHUB_TOKEN)
    pub name: String,
    /// Secret value
    pub value: String,
}

pub fn run(ctx: &OutputContext, json_output: bool, command: ConfigCommand) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let store = ConfigStore::new(&paths);

    match command {
        ConfigCommand::Show => {
            let config = store.read()?;
            if json_output {
                return json::render(&config);
            }
            ctx.line(&serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Secrets => {
            let config = store.read()?;
            if json_output {
                return json::render(&serde_json::json!({"secrets": config.secrets}));
            }
            if config.secrets.is_empty() {
                ctx.line("No secrets declared by installed stacks.");
                return Ok(());
            }
            for (name, meta) in &config.secrets {
                let state = if meta.configured {
                    "configured".style(ctx.styles.success)
                } else {
                    "missing".style(ctx.styles.warning)
                };
                ctx.line(&format!(
                    "{} {state} {}",
                    name.style(ctx.styles.bold),
                    meta.stack.as_deref().unwrap_or_default().style(ctx.styles.dim),
                ));
            }
        }
        ConfigCommand::SetSecret(args) => {
            let secrets = FileSecretStore::new(&paths);
            secrets.set(&args.name, &args.value)?;
            store.update_secret_status(&args.name, true)?;
            if json_output {
                return json::render(&serde_json::json!({
                    "success": true,
                    "name": args.name,
                }));
            }
            ctx.line(&format!("Stored secret {}", args.name));
        }
    }
    Ok(())
}
