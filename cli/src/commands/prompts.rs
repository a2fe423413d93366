//! `agora prompts` — render installed prompt templates.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use crate::infra::paths::AgoraPaths;
use crate::infra::prompts::{load_prompt, render_prompt};
use crate::output::{json, OutputContext};

#[derive(Subcommand)]
pub enum PromptsCommand {
    /// Render a prompt with variable values
    Render(RenderArgs),
    /// Show a prompt's declared variables
    Vars(VarsArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Prompt name
    pub name: String,

    /// Variable value as `name=value` (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,
}

#[derive(Args)]
pub struct VarsArgs {
    /// Prompt name
    pub name: String,
}

pub fn run(ctx: &OutputContext, json_output: bool, command: PromptsCommand) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    match command {
        PromptsCommand::Render(args) => {
            let manifest = load_prompt(&paths, &args.name)?;
            let mut values = BTreeMap::new();
            for pair in &args.vars {
                let (name, value) = pair
                    .split_once('=')
                    .with_context(|| format!("--var '{pair}' is not NAME=VALUE"))?;
                values.insert(name.to_string(), value.to_string());
            }
            let rendered = render_prompt(&manifest, &values)?;
            if json_output {
                return json::render(&serde_json::json!({
                    "id": manifest.id,
                    "rendered": rendered,
                }));
            }
            println!("{rendered}");
        }
        PromptsCommand::Vars(args) => {
            let manifest = load_prompt(&paths, &args.name)?;
            if json_output {
                return json::render(&serde_json::json!({"variables": manifest.variables}));
            }
            if manifest.variables.is_empty() {
                ctx.line("No variables declared.");
                return Ok(());
            }
            for variable in &manifest.variables {
                let required = if variable.required { "required" } else { "optional" };
                ctx.line(&format!(
                    "{} {} {}",
                    variable.name.style(ctx.styles.bold),
                    required.style(ctx.styles.dim),
                    variable.default.as_deref().unwrap_or_default().style(ctx.styles.dim),
                ));
            }
        }
    }
    Ok(())
}
