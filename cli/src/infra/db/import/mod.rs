//! Transcript import pipeline.
//!
//! Three parsers — one per provider directory layout — each turn a
//! directory tree of transcript files into `(NewSession, Vec<NewTurn>)`
//! records; insertion deduplicates on `(provider, provider_session_id)`,
//! renumbers turns from 1, prices each turn, and keeps session totals in
//! sync. A single malformed file is recorded and skipped, never fatal.

pub mod claude;
pub mod codex;
pub mod gemini;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use super::pricing::TokenUsage;
use super::SessionDb;

// ── Records produced by the parsers ──────────────────────────────────────────

/// A parsed conversation container, pre-insertion.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub provider: String,
    pub provider_session_id: String,
    pub title: Option<String>,
    pub model: Option<String>,
    pub cwd: Option<String>,
    /// Provider-scoped project group (directory name).
    pub project: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

/// One user+assistant exchange, pre-insertion.
#[derive(Debug, Clone, Default)]
pub struct NewTurn {
    pub user_message: String,
    pub assistant_response: String,
    pub model: Option<String>,
    pub usage: TokenUsage,
    pub tools_used: Vec<String>,
    pub created_at: Option<String>,
}

/// A session with its turns, ready for insertion.
#[derive(Debug, Clone)]
pub struct ParsedSession {
    pub session: NewSession,
    pub turns: Vec<NewTurn>,
}

// ── Options and accounting ───────────────────────────────────────────────────

/// Import behaviour switches.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Skip sessions already present for `(provider, provider_session_id)`.
    pub skip_existing: bool,
    /// Skip sessions with zero turns.
    pub skip_dead: bool,
    /// Derive a title from the first user message when the provider has none.
    pub infer_titles: bool,
    /// Restrict to one provider (`claude`, `codex`, `gemini`).
    pub provider: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { skip_existing: true, skip_dead: true, infer_titles: true, provider: None }
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ImportStats {
    pub scanned: usize,
    pub imported: usize,
    pub skipped_existing: usize,
    pub skipped_dead: usize,
    pub errors: Vec<String>,
}

/// Outcome for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Imported(i64),
    SkippedExisting,
    SkippedDead,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

impl SessionDb {
    /// Scan every provider directory under `home` and import what is found.
    ///
    /// # Errors
    ///
    /// Returns an error only for database failures; per-file parse problems
    /// are collected into `ImportStats::errors`.
    pub fn import_from_home(&self, home: &Path, options: &ImportOptions) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let wants = |p: &str| options.provider.as_deref().map_or(true, |want| want == p);

        if wants("claude") {
            let sessions = claude::scan(home, options.infer_titles, &mut stats.errors);
            self.import_sessions(&sessions, options, &mut stats)?;
        }
        if wants("codex") {
            let sessions = codex::scan(home, &mut stats.errors);
            self.import_sessions(&sessions, options, &mut stats)?;
        }
        if wants("gemini") {
            let sessions = gemini::scan(home, &mut stats.errors);
            self.import_sessions(&sessions, options, &mut stats)?;
        }
        Ok(stats)
    }

    /// Import one parsed session.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn insert_session(
        &self,
        parsed: &ParsedSession,
        options: &ImportOptions,
    ) -> Result<InsertOutcome> {
        let session = &parsed.session;
        if options.skip_dead && parsed.turns.is_empty() {
            return Ok(InsertOutcome::SkippedDead);
        }

        let existing: Option<i64> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM sessions WHERE provider = ?1 AND provider_session_id = ?2",
                rusqlite::params![session.provider, session.provider_session_id],
                |row| row.get(0),
            )
            .optional()
            .context("checking for existing session")
        })?;
        if existing.is_some() && options.skip_existing {
            return Ok(InsertOutcome::SkippedExisting);
        }

        // Price the turns before taking the write lock.
        let mut priced: Vec<(NewTurn, f64)> = Vec::with_capacity(parsed.turns.len());
        for turn in &parsed.turns {
            let model = turn
                .model
                .as_deref()
                .or(session.model.as_deref())
                .unwrap_or_default();
            let cost = self.calculate_cost(&session.provider, model, turn.usage)?;
            priced.push((turn.clone(), cost));
        }

        let session = session.clone();
        self.with_conn(move |conn| {
            conn.execute("BEGIN IMMEDIATE", []).context("opening import transaction")?;
            let result = insert_tx(conn, &session, &priced, existing);
            match &result {
                Ok(_) => conn.execute("COMMIT", []).context("committing import")?,
                Err(_) => conn.execute("ROLLBACK", []).context("rolling back import")?,
            };
            result
        })
    }
}

fn insert_tx(
    conn: &rusqlite::Connection,
    session: &NewSession,
    turns: &[(NewTurn, f64)],
    existing: Option<i64>,
) -> Result<InsertOutcome> {
    if let Some(old_id) = existing {
        conn.execute("DELETE FROM sessions WHERE id = ?1", [old_id])
            .context("replacing existing session")?;
    }

    let project_id: Option<i64> = match &session.project {
        Some(project) => {
            conn.execute(
                "INSERT OR IGNORE INTO projects (provider, name, path) VALUES (?1, ?2, ?3)",
                rusqlite::params![session.provider, project, session.cwd],
            )
            .context("recording project")?;
            conn.query_row(
                "SELECT id FROM projects WHERE provider = ?1 AND name = ?2",
                rusqlite::params![session.provider, project],
                |row| row.get(0),
            )
            .optional()
            .context("resolving project id")?
        }
        None => None,
    };

    let totals = turns.iter().fold(
        (0i64, 0i64, 0i64, 0f64),
        |(input, output, cache_read, cost), (turn, turn_cost)| {
            (
                input + turn.usage.input_tokens,
                output + turn.usage.output_tokens,
                cache_read + turn.usage.cache_read_tokens,
                cost + turn_cost,
            )
        },
    );

    conn.execute(
        "INSERT INTO sessions
         (project_id, provider, provider_session_id, title, model, cwd,
          started_at, ended_at, turn_count,
          total_input_tokens, total_output_tokens, total_cache_read_tokens, total_cost_usd)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            project_id,
            session.provider,
            session.provider_session_id,
            session.title,
            session.model,
            session.cwd,
            session.started_at,
            session.ended_at,
            turns.len() as i64,
            totals.0,
            totals.1,
            totals.2,
            totals.3,
        ],
    )
    .context("inserting session")?;
    let session_id = conn.last_insert_rowid();

    for (number, (turn, cost)) in turns.iter().enumerate() {
        let tools_json = if turn.tools_used.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&turn.tools_used).context("encoding tools_used")?)
        };
        conn.execute(
            "INSERT INTO turns
             (session_id, turn_number, user_message, assistant_response, model,
              input_tokens, output_tokens, cache_read_tokens, cost_usd, tools_used, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                session_id,
                (number + 1) as i64,
                turn.user_message,
                turn.assistant_response,
                turn.model,
                turn.usage.input_tokens,
                turn.usage.output_tokens,
                turn.usage.cache_read_tokens,
                cost,
                tools_json,
                turn.created_at,
            ],
        )
        .context("inserting turn")?;
    }

    Ok(InsertOutcome::Imported(session_id))
}

// ── Shared parser helpers ────────────────────────────────────────────────────

/// Title from the first user message: first line, at most 100 characters.
#[must_use]
pub fn title_from_message(message: &str) -> Option<String> {
    let line = message.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(100).collect())
}

/// Import every parsed session of one provider scan, folding outcomes into
/// the stats.
impl SessionDb {
    /// Parse then insert in one pass, used by the import command.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn import_sessions(
        &self,
        sessions: &[ParsedSession],
        options: &ImportOptions,
        stats: &mut ImportStats,
    ) -> Result<()> {
        for parsed in sessions {
            stats.scanned += 1;
            match self.insert_session(parsed, options)? {
                InsertOutcome::Imported(_) => stats.imported += 1,
                InsertOutcome::SkippedExisting => stats.skipped_existing += 1,
                InsertOutcome::SkippedDead => stats.skipped_dead += 1,
            }
        }
        Ok(())
    }
}
