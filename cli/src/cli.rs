//! CLI argument parsing with clap derive.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::output::{json, OutputContext};

/// Local package manager for AI-agent tooling
#[derive(Parser)]
#[command(
    name = "agora",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install a package and its dependencies
    Install(commands::install::InstallArgs),

    /// Remove an installed package
    Uninstall(commands::uninstall::UninstallArgs),

    /// List installed packages
    List,

    /// Search the registry
    Search(commands::search::SearchArgs),

    /// Show one package's descriptor and install state
    Info(commands::info::InfoArgs),

    /// Reinstall packages at the latest registry state
    Update(commands::update::UpdateArgs),

    /// Render installed prompt templates
    #[command(subcommand)]
    Prompts(commands::prompts::PromptsCommand),

    /// Stack operations (tool indexing)
    #[command(subcommand)]
    Stacks(commands::stacks::StacksCommand),

    /// Agent detection and MCP registration
    #[command(subcommand)]
    Agents(commands::agents::AgentsCommand),

    /// Transcript import, search, and statistics
    #[command(subcommand)]
    Sessions(commands::sessions::SessionsCommand),

    /// Central config and secrets
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command. On failure with `--json`, the stable error
    /// object additionally lands on stdout.
    ///
    /// # Errors
    ///
    /// Returns the command's error for the caller to report on stderr.
    pub async fn run(self) -> Result<()> {
        let Cli { json: json_output, quiet, no_color, command } = self;
        let ctx = OutputContext::new(no_color, quiet);

        let result = match command {
            Command::Install(args) => commands::install::run(&ctx, json_output, &args).await,
            Command::Uninstall(args) => commands::uninstall::run(&ctx, json_output, &args),
            Command::List => commands::list::run(&ctx, json_output),
            Command::Search(args) => commands::search::run(&ctx, json_output, &args),
            Command::Info(args) => commands::info::run(&ctx, json_output, &args),
            Command::Update(args) => commands::update::run(&ctx, json_output, &args).await,
            Command::Prompts(command) => commands::prompts::run(&ctx, json_output, command),
            Command::Stacks(command) => commands::stacks::run(&ctx, json_output, command).await,
            Command::Agents(command) => commands::agents::run(&ctx, json_output, command),
            Command::Sessions(command) => commands::sessions::run(&ctx, json_output, command),
            Command::Config(command) => commands::config::run(&ctx, json_output, command),
            Command::Version => commands::version::run(json_output),
        };

        if json_output {
            if let Err(e) = &result {
                println!("{}", json::format_error(e));
            }
        }
        result
    }
}
