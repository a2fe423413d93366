//! `agora sessions` — transcript import, search, statistics, and logs.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;

use crate::application::services::session_import::run_import;
use crate::infra::db::{ImportOptions, LogFilter, SessionDb};
use crate::infra::paths::AgoraPaths;
use crate::output::{json, OutputContext};

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// Import transcripts from installed agent providers
    Import(ImportArgs),
    /// Full-text search over imported turns
    Search(SearchArgs),
    /// Aggregate statistics per provider
    Stats,
    /// Query the observability log stream
    Logs(LogsArgs),
    /// Delete log events older than N days
    CleanupLogs(CleanupArgs),
}

#[derive(Args)]
pub struct ImportArgs {
    /// Only this provider (claude, codex, gemini)
    #[arg(long)]
    pub provider: Option<String>,

    /// Re-import sessions that already exist
    #[arg(long)]
    pub reimport: bool,

    /// Keep sessions with zero turns
    #[arg(long)]
    pub include_dead: bool,

    /// Do not derive titles from the first user message
    #[arg(long)]
    pub no_titles: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query; every whitespace-separated token must match
    pub query: String,

    /// Maximum number of hits
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args)]
pub struct LogsArgs {
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long)]
    pub level: Option<String>,

    /// Only events at least this slow (milliseconds)
    #[arg(long)]
    pub slow: Option<i64>,

    /// Substring over the JSON payload
    #[arg(long)]
    pub contains: Option<String>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Age cutoff in days
    #[arg(long, default_value_t = 30)]
    pub days: i64,
}

pub fn run(ctx: &OutputContext, json_output: bool, command: SessionsCommand) -> Result<()> {
    let paths = AgoraPaths::resolve()?;
    let db = SessionDb::open(&paths.db_file())?;

    match command {
        SessionsCommand::Import(args) => {
            let home = dirs::home_dir().context("cannot determine home directory")?;
            let options = ImportOptions {
                skip_existing: !args.reimport,
                skip_dead: !args.include_dead,
                infer_titles: !args.no_titles,
                provider: args.provider,
            };
            let stats = run_import(&db, &paths, &home, &options, ctx)?;
            if json_output {
                json::render(&stats)?;
            } else {
                for error in &stats.errors {
                    ctx.line(&format!("  {}", error.style(ctx.styles.warning)));
                }
            }
        }
        SessionsCommand::Search(args) => {
            let hits = db.search(&args.query, args.limit)?;
            if json_output {
                return json::render(&serde_json::json!({"results": hits}));
            }
            if hits.is_empty() {
                ctx.line("No matching turns.");
                return Ok(());
            }
            for hit in hits {
                ctx.line(&format!(
                    "{} {} #{}",
                    hit.provider.style(ctx.styles.dim),
                    hit.session_title.as_deref().unwrap_or("(untitled)").style(ctx.styles.bold),
                    hit.turn_number,
                ));
                ctx.line(&format!("  {}", hit.user_snippet));
            }
        }
        SessionsCommand::Stats => {
            let stats = db.stats()?;
            if json_output {
                return json::render(&serde_json::json!({"providers": stats}));
            }
            if stats.is_empty() {
                ctx.line("Nothing imported yet. Try: agora sessions import");
                return Ok(());
            }
            for provider in stats {
                ctx.line(&format!(
                    "{}: {} sessions, {} turns, {} in / {} out tokens, ${:.2}",
                    provider.provider.style(ctx.styles.header),
                    provider.sessions,
                    provider.turns,
                    provider.input_tokens,
                    provider.output_tokens,
                    provider.cost_usd,
                ));
            }
        }
        SessionsCommand::Logs(args) => {
            let rows = db.query_logs(&LogFilter {
                source: args.source,
                level: args.level,
                slow_ms: args.slow,
                contains: args.contains,
                limit: Some(args.limit),
                ..LogFilter::default()
            })?;
            if json_output {
                return json::render(&serde_json::json!({"logs": rows}));
            }
            for row in rows {
                ctx.line(&format!(
                    "{} [{}] {} {}",
                    row.timestamp.style(ctx.styles.dim),
                    row.level,
                    row.event_type.style(ctx.styles.bold),
                    row.payload.as_deref().unwrap_or_default(),
                ));
            }
        }
        SessionsCommand::CleanupLogs(args) => {
            let removed = db.cleanup_old_logs(args.days)?;
            if json_output {
                return json::render(&serde_json::json!({"removed": removed}));
            }
            ctx.line(&format!("Removed {removed} log events older than {} days", args.days));
        }
    }
    Ok(())
}
