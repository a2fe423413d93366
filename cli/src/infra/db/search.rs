//! Full-text search over imported turns.
//!
//! Queries are sanitised (quoting, parens, dashes, and stars stripped),
//! tokenised on whitespace, and each token wrapped as a prefix-matched FTS
//! term (`"tok"*`). Matches join back to turns and sessions with
//! `highlight()` wrappers and `bm25()` ranking; an FTS syntax failure falls
//! back to a plain `LIKE` scan.

use anyhow::{Context, Result};
use serde::Serialize;

use super::SessionDb;

/// Marker wrapped around matched tokens in snippets.
pub const HIGHLIGHT_OPEN: &str = ">>>";
pub const HIGHLIGHT_CLOSE: &str = "<<<";

/// One search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub turn_id: i64,
    pub session_id: i64,
    pub provider: String,
    pub session_title: Option<String>,
    pub turn_number: i64,
    pub user_snippet: String,
    pub assistant_snippet: String,
    pub rank: f64,
}

/// Strip FTS-significant punctuation and collapse whitespace.
#[must_use]
pub fn sanitize_query(query: &str) -> String {
    query
        .replace(['"', '\'', '(', ')', '-', '*'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the FTS MATCH expression: every token prefix-quoted.
#[must_use]
pub fn fts_expression(sanitized: &str) -> String {
    sanitized
        .split_whitespace()
        .map(|token| format!("\"{token}\"*"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl SessionDb {
    /// Search turns, best matches first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure (not on odd query syntax —
    /// that path falls back to `LIKE`).
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let sanitized = sanitize_query(query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }
        let expression = fts_expression(&sanitized);

        match self.search_fts(&expression, limit) {
            Ok(results) => Ok(results),
            Err(_) => self.search_like(&sanitized, limit),
        }
    }

    fn search_fts(&self, expression: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT t.id, s.id, s.provider, s.title, t.turn_number,
                            highlight(turns_fts, 0, ?2, ?3),
                            highlight(turns_fts, 1, ?2, ?3),
                            bm25(turns_fts) AS rank
                     FROM turns_fts
                     JOIN turns t ON t.id = turns_fts.rowid
                     JOIN sessions s ON s.id = t.session_id
                     WHERE turns_fts MATCH ?1
                     ORDER BY rank
                     LIMIT ?4",
                )
                .context("preparing FTS query")?;
            let rows = stmt
                .query_map(
                    rusqlite::params![expression, HIGHLIGHT_OPEN, HIGHLIGHT_CLOSE, limit as i64],
                    |row| {
                        Ok(SearchResult {
                            turn_id: row.get(0)?,
                            session_id: row.get(1)?,
                            provider: row.get(2)?,
                            session_title: row.get(3)?,
                            turn_number: row.get(4)?,
                            user_snippet: row.get(5)?,
                            assistant_snippet: row.get(6)?,
                            rank: row.get(7)?,
                        })
                    },
                )
                .context("running FTS query")?;
            rows.collect::<Result<Vec<_>, _>>().context("reading FTS rows")
        })
    }

    fn search_like(&self, sanitized: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let needle = format!("%{sanitized}%");
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT t.id, s.id, s.provider, s.title, t.turn_number,
                            t.user_message, t.assistant_response
                     FROM turns t
                     JOIN sessions s ON s.id = t.session_id
                     WHERE t.user_message LIKE ?1 OR t.assistant_response LIKE ?1
                     ORDER BY t.id DESC
                     LIMIT ?2",
                )
                .context("preparing LIKE fallback")?;
            let rows = stmt
                .query_map(rusqlite::params![needle, limit as i64], |row| {
                    Ok(SearchResult {
                        turn_id: row.get(0)?,
                        session_id: row.get(1)?,
                        provider: row.get(2)?,
                        session_title: row.get(3)?,
                        turn_number: row.get(4)?,
                        user_snippet: row.get(5)?,
                        assistant_snippet: row.get(6)?,
                        rank: 0.0,
                    })
                })
                .context("running LIKE fallback")?;
            rows.collect::<Result<Vec<_>, _>>().context("reading LIKE rows")
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::super::import::{ImportOptions, NewSession, NewTurn, ParsedSession};
    use super::*;

    fn import_turn(db: &SessionDb, user: &str, assistant: &str) {
        let parsed = ParsedSession {
            session: NewSession {
                provider: "claude".to_string(),
                provider_session_id: format!("s-{user:.8}"),
                title: Some(user.to_string()),
                ..NewSession::default()
            },
            turns: vec![NewTurn {
                user_message: user.to_string(),
                assistant_response: assistant.to_string(),
                ..NewTurn::default()
            }],
        };
        db.insert_session(&parsed, &ImportOptions::default()).expect("imports");
    }

    #[test]
    fn test_sanitize_strips_fts_punctuation() {
        assert_eq!(sanitize_query("\"auth\" (login) -bug *"), "auth login bug");
        assert_eq!(fts_expression("auth login"), "\"auth\"* \"login\"*");
    }

    #[test]
    fn test_search_round_trip_with_highlighting() {
        let db = SessionDb::open_in_memory().expect("opens");
        import_turn(&db, "fix authentication bug in login handler", "Done.");
        import_turn(&db, "write release notes", "Drafted.");

        let hits = db.search("authentication login", 10).expect("searches");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].user_snippet.contains(">>>authentication<<<"));
        assert!(hits[0].user_snippet.contains(">>>login<<<"));

        let hits = db.search("bug", 10).expect("searches");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].turn_number, 1);
    }

    #[test]
    fn test_search_requires_every_token() {
        let db = SessionDb::open_in_memory().expect("opens");
        import_turn(&db, "fix authentication bug", "Done.");
        assert!(db.search("authentication missingtoken", 10).expect("searches").is_empty());
    }

    #[test]
    fn test_search_prefix_matches_tokens() {
        let db = SessionDb::open_in_memory().expect("opens");
        import_turn(&db, "refactor the scheduler", "OK.");
        assert_eq!(db.search("schedul", 10).expect("searches").len(), 1);
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let db = SessionDb::open_in_memory().expect("opens");
        import_turn(&db, "anything", "at all");
        assert!(db.search("\"\" --", 10).expect("searches").is_empty());
    }
}
