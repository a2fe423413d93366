//! Observability event stream.
//!
//! Commands and services append structured events; `query_logs` filters on
//! time range, source, level, type, provider, session, free-text payload
//! substring, and a slow-only duration threshold, paginated and ordered
//! newest first.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::SessionDb;

/// One event to store. A missing timestamp gets the current instant.
#[derive(Debug, Clone, Default)]
pub struct LogEvent {
    pub timestamp: Option<String>,
    pub source: String,
    pub level: String,
    pub event_type: String,
    pub provider: Option<String>,
    pub session_id: Option<String>,
    pub terminal_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub payload: Option<JsonValue>,
}

/// Filters for `query_logs`. All fields optional; `limit` defaults to 100.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub since: Option<String>,
    pub until: Option<String>,
    pub source: Option<String>,
    pub level: Option<String>,
    pub event_type: Option<String>,
    pub provider: Option<String>,
    pub session_id: Option<String>,
    /// Substring match over the JSON payload.
    pub contains: Option<String>,
    /// Only events with `duration_ms >=` this threshold.
    pub slow_ms: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// One stored event.
#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    pub id: i64,
    pub timestamp: String,
    pub source: String,
    pub level: String,
    pub event_type: String,
    pub provider: Option<String>,
    pub session_id: Option<String>,
    pub terminal_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub payload: Option<String>,
}

impl SessionDb {
    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn store_log_event(&self, event: &LogEvent) -> Result<i64> {
        let payload = event
            .payload
            .as_ref()
            .map(|p| serde_json::to_string(p).context("encoding log payload"))
            .transpose()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO logs
                 (timestamp, source, level, event_type, provider, session_id,
                  terminal_id, duration_ms, payload)
                 VALUES (COALESCE(?1, strftime('%Y-%m-%dT%H:%M:%SZ','now')),
                         ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    event.timestamp,
                    event.source,
                    event.level,
                    event.event_type,
                    event.provider,
                    event.session_id,
                    event.terminal_id,
                    event.duration_ms,
                    payload,
                ],
            )
            .context("inserting log event")?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Query events, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn query_logs(&self, filter: &LogFilter) -> Result<Vec<LogRow>> {
        let mut sql = String::from(
            "SELECT id, timestamp, source, level, event_type, provider,
                    session_id, terminal_id, duration_ms, payload
             FROM logs WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let mut push = |sql: &mut String, clause: &str, value: Box<dyn rusqlite::ToSql>| {
            params.push(value);
            sql.push_str(&format!(" AND {clause} ?{}", params.len()));
        };
        if let Some(since) = &filter.since {
            push(&mut sql, "timestamp >=", Box::new(since.clone()));
        }
        if let Some(until) = &filter.until {
            push(&mut sql, "timestamp <=", Box::new(until.clone()));
        }
        if let Some(source) = &filter.source {
            push(&mut sql, "source =", Box::new(source.clone()));
        }
        if let Some(level) = &filter.level {
            push(&mut sql, "level =", Box::new(level.clone()));
        }
        if let Some(event_type) = &filter.event_type {
            push(&mut sql, "event_type =", Box::new(event_type.clone()));
        }
        if let Some(provider) = &filter.provider {
            push(&mut sql, "provider =", Box::new(provider.clone()));
        }
        if let Some(session_id) = &filter.session_id {
            push(&mut sql, "session_id =", Box::new(session_id.clone()));
        }
        if let Some(contains) = &filter.contains {
            push(&mut sql, "payload LIKE", Box::new(format!("%{contains}%")));
        }
        if let Some(slow_ms) = filter.slow_ms {
            push(&mut sql, "duration_ms >=", Box::new(slow_ms));
        }

        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            filter.limit.unwrap_or(100),
            filter.offset.unwrap_or(0)
        ));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).context("preparing log query")?;
            let params_ref: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(AsRef::as_ref).collect();
            let rows = stmt
                .query_map(params_ref.as_slice(), |row| {
                    Ok(LogRow {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        source: row.get(2)?,
                        level: row.get(3)?,
                        event_type: row.get(4)?,
                        provider: row.get(5)?,
                        session_id: row.get(6)?,
                        terminal_id: row.get(7)?,
                        duration_ms: row.get(8)?,
                        payload: row.get(9)?,
                    })
                })
                .context("running log query")?;
            rows.collect::<Result<Vec<_>, _>>().context("reading log rows")
        })
    }

    /// Delete events older than `days`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn cleanup_old_logs(&self, days: i64) -> Result<usize> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM logs
                 WHERE timestamp < strftime('%Y-%m-%dT%H:%M:%SZ','now', ?1)",
                [format!("-{days} days")],
            )
            .context("deleting old logs")
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(source: &str, level: &str, duration_ms: Option<i64>) -> LogEvent {
        LogEvent {
            source: source.to_string(),
            level: level.to_string(),
            event_type: "install".to_string(),
            duration_ms,
            payload: Some(serde_json::json!({"package": "binary:ripgrep"})),
            ..LogEvent::default()
        }
    }

    #[test]
    fn test_store_and_query_round_trip() {
        let db = SessionDb::open_in_memory().expect("opens");
        db.store_log_event(&event("installer", "info", Some(1200))).expect("stores");
        let rows = db.query_logs(&LogFilter::default()).expect("queries");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, "installer");
        assert!(rows[0].payload.as_deref().expect("payload").contains("ripgrep"));
    }

    #[test]
    fn test_slow_only_filter() {
        let db = SessionDb::open_in_memory().expect("opens");
        db.store_log_event(&event("indexer", "info", Some(50))).expect("stores");
        db.store_log_event(&event("indexer", "info", Some(5000))).expect("stores");

        let slow = db
            .query_logs(&LogFilter { slow_ms: Some(1000), ..LogFilter::default() })
            .expect("queries");
        assert_eq!(slow.len(), 1);
        assert_eq!(slow[0].duration_ms, Some(5000));
    }

    #[test]
    fn test_substring_and_level_filters_compose() {
        let db = SessionDb::open_in_memory().expect("opens");
        db.store_log_event(&event("installer", "error", None)).expect("stores");
        db.store_log_event(&event("installer", "info", None)).expect("stores");

        let rows = db
            .query_logs(&LogFilter {
                level: Some("error".to_string()),
                contains: Some("ripgrep".to_string()),
                ..LogFilter::default()
            })
            .expect("queries");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].level, "error");
    }

    #[test]
    fn test_pagination_orders_newest_first() {
        let db = SessionDb::open_in_memory().expect("opens");
        for i in 0..5 {
            db.store_log_event(&LogEvent {
                timestamp: Some(format!("2025-06-0{}T00:00:00Z", i + 1)),
                ..event("cli", "info", None)
            })
            .expect("stores");
        }
        let page = db
            .query_logs(&LogFilter {
                limit: Some(2),
                offset: Some(1),
                ..LogFilter::default()
            })
            .expect("queries");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].timestamp, "2025-06-04T00:00:00Z");
    }

    #[test]
    fn test_cleanup_removes_old_events() {
        let db = SessionDb::open_in_memory().expect("opens");
        db.store_log_event(&LogEvent {
            timestamp: Some("2020-01-01T00:00:00Z".to_string()),
            ..event("cli", "info", None)
        })
        .expect("stores");
        db.store_log_event(&event("cli", "info", None)).expect("stores");

        let removed = db.cleanup_old_logs(30).expect("cleans");
        assert_eq!(removed, 1);
        assert_eq!(db.query_logs(&LogFilter::default()).expect("queries").len(), 1);
    }
}
