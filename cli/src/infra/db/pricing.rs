//! Model pricing lookup and cost calculation.
//!
//! Rows are matched by exact pattern equality first, then `model LIKE
//! pattern` (SQL `%` wildcards), restricted to rows still in effect,
//! ordered by exactness, pattern length, then most recent
//! `effective_from`. When nothing matches, hard-coded fallback rates keep
//! cost accounting monotonic rather than silently zero.

use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use serde::Serialize;

use super::SessionDb;

/// Fallback per-MTok rates when no pricing row matches.
pub const FALLBACK_RATES: (f64, f64, f64) = (3.0, 15.0, 0.3);

/// Token usage of one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
}

/// One pricing row as stored.
#[derive(Debug, Clone, Serialize)]
pub struct PricingRow {
    pub provider: String,
    pub model_pattern: String,
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    pub cache_read_per_mtok: f64,
    pub effective_from: Option<String>,
    pub effective_until: Option<String>,
}

impl SessionDb {
    /// Cost in USD for one turn's usage:
    /// `(input·i + output·o + cache_read·r) / 1e6`.
    ///
    /// # Errors
    ///
    /// Returns an error only for database failures; a missing pricing row
    /// falls back to `FALLBACK_RATES`.
    pub fn calculate_cost(&self, provider: &str, model: &str, usage: TokenUsage) -> Result<f64> {
        let rates = self.lookup_rates(provider, model)?.unwrap_or(FALLBACK_RATES);
        let (input, output, cache_read) = rates;
        Ok((usage.input_tokens as f64 * input
            + usage.output_tokens as f64 * output
            + usage.cache_read_tokens as f64 * cache_read)
            / 1e6)
    }

    fn lookup_rates(&self, provider: &str, model: &str) -> Result<Option<(f64, f64, f64)>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT input_per_mtok, output_per_mtok, cache_read_per_mtok
                 FROM model_pricing
                 WHERE provider = ?1
                   AND (model_pattern = ?2 OR ?2 LIKE model_pattern)
                   AND (effective_until IS NULL
                        OR effective_until > strftime('%Y-%m-%dT%H:%M:%SZ','now'))
                 ORDER BY (model_pattern = ?2) DESC,
                          LENGTH(model_pattern) DESC,
                          effective_from DESC
                 LIMIT 1",
                rusqlite::params![provider, model],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("querying model pricing")
        })
    }

    /// Insert a pricing row (tests and future `pricing sync` tooling).
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn insert_pricing(&self, row: &PricingRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO model_pricing
                 (provider, model_pattern, input_per_mtok, output_per_mtok,
                  cache_read_per_mtok, effective_from, effective_until)
                 VALUES (?1, ?2, ?3, ?4, ?5,
                         COALESCE(?6, strftime('%Y-%m-%dT%H:%M:%SZ','now')), ?7)",
                rusqlite::params![
                    row.provider,
                    row.model_pattern,
                    row.input_per_mtok,
                    row.output_per_mtok,
                    row.cache_read_per_mtok,
                    row.effective_from,
                    row.effective_until,
                ],
            )
            .context("inserting pricing row")?;
            Ok(())
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn db_with(rows: &[(&str, &str, f64, f64)]) -> SessionDb {
        let db = SessionDb::open_in_memory().expect("opens");
        db.with_conn(|conn| {
            conn.execute("DELETE FROM model_pricing", []).context("clear seeds")
        })
        .expect("clears");
        for (provider, pattern, input, output) in rows {
            db.insert_pricing(&PricingRow {
                provider: (*provider).to_string(),
                model_pattern: (*pattern).to_string(),
                input_per_mtok: *input,
                output_per_mtok: *output,
                cache_read_per_mtok: 0.0,
                effective_from: None,
                effective_until: None,
            })
            .expect("inserts");
        }
        db
    }

    #[test]
    fn test_cost_selects_matching_pattern() {
        // Scenario: sonnet and haiku rows; a sonnet model picks the sonnet
        // rates: 1M input at $3 + 500k output at $15 = $10.50.
        let db = db_with(&[
            ("claude", "claude-sonnet-4-5-%", 3.0, 15.0),
            ("claude", "claude-haiku-4-5-%", 0.8, 4.0),
        ]);
        let cost = db
            .calculate_cost(
                "claude",
                "claude-sonnet-4-5-20250101",
                TokenUsage { input_tokens: 1_000_000, output_tokens: 500_000, cache_read_tokens: 0 },
            )
            .expect("cost");
        assert!((cost - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_exact_pattern_beats_wildcard() {
        let db = db_with(&[
            ("claude", "claude-sonnet-%", 100.0, 100.0),
            ("claude", "claude-sonnet-4-5", 1.0, 1.0),
        ]);
        let cost = db
            .calculate_cost(
                "claude",
                "claude-sonnet-4-5",
                TokenUsage { input_tokens: 1_000_000, ..TokenUsage::default() },
            )
            .expect("cost");
        assert!((cost - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_longest_pattern_wins_among_wildcards() {
        let db = db_with(&[
            ("claude", "claude-%", 100.0, 100.0),
            ("claude", "claude-sonnet-4-5-%", 2.0, 2.0),
        ]);
        let cost = db
            .calculate_cost(
                "claude",
                "claude-sonnet-4-5-20250101",
                TokenUsage { input_tokens: 1_000_000, ..TokenUsage::default() },
            )
            .expect("cost");
        assert!((cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_fallback_rates() {
        let db = db_with(&[]);
        let cost = db
            .calculate_cost(
                "claude",
                "mystery-model",
                TokenUsage { input_tokens: 1_000_000, ..TokenUsage::default() },
            )
            .expect("cost");
        assert!((cost - FALLBACK_RATES.0).abs() < 1e-9);
    }

    #[test]
    fn test_expired_rows_are_ignored() {
        let db = db_with(&[]);
        db.insert_pricing(&PricingRow {
            provider: "claude".to_string(),
            model_pattern: "claude-%".to_string(),
            input_per_mtok: 42.0,
            output_per_mtok: 42.0,
            cache_read_per_mtok: 0.0,
            effective_from: Some("2020-01-01T00:00:00Z".to_string()),
            effective_until: Some("2020-12-31T00:00:00Z".to_string()),
        })
        .expect("inserts");
        let cost = db
            .calculate_cost(
                "claude",
                "claude-sonnet",
                TokenUsage { input_tokens: 1_000_000, ..TokenUsage::default() },
            )
            .expect("cost");
        assert!((cost - FALLBACK_RATES.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_is_monotonic_in_each_dimension() {
        let db = db_with(&[("claude", "m%", 1.0, 2.0)]);
        let base = db
            .calculate_cost("claude", "m1", TokenUsage { input_tokens: 100, output_tokens: 100, cache_read_tokens: 100 })
            .expect("cost");
        let more_output = db
            .calculate_cost("claude", "m1", TokenUsage { input_tokens: 100, output_tokens: 200, cache_read_tokens: 100 })
            .expect("cost");
        assert!(more_output > base);
    }
}
