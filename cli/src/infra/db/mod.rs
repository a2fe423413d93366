//! The session database.
//!
//! A single-file SQLite database (WAL, synchronous=NORMAL, foreign keys on,
//! 64 MiB page cache) holding imported conversation transcripts with FTS5
//! search, model pricing, the observability log stream, and a mirror of the
//! file-system install state. `SessionDb` is an explicit context value —
//! tests open private databases in temp directories; nothing is global.
//!
//! `rusqlite::Connection` is `Send` but not `Sync`; the `Mutex` wrapper
//! makes the handle shareable.

pub mod import;
pub mod logs;
pub mod pricing;
pub mod schema;
pub mod search;
pub mod stats;

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::domain::error::DbError;

pub use import::{ImportOptions, ImportStats, NewSession, NewTurn};
pub use logs::{LogEvent, LogFilter, LogRow};
pub use pricing::{PricingRow, TokenUsage};
pub use search::SearchResult;
pub use stats::ProviderStats;

/// Handle on the session database.
pub struct SessionDb {
    conn: Mutex<Connection>,
}

impl SessionDb {
    /// Open (and migrate) the database at `path`, materialising the parent
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `DbError::MigrationFailed` when a migration cannot be
    /// applied, or an I/O error for anything else.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// An in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns an error if schema setup fails.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory().context("opening in-memory db")?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting synchronous")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;
        // Negative cache_size is KiB: 64 MiB page cache.
        conn.pragma_update(None, "cache_size", -65536)
            .context("setting cache size")?;

        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// Run a closure against the underlying connection.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| anyhow::anyhow!("database mutex poisoned"))?;
        f(&conn)
    }

    fn with_conn_mut<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn =
            self.conn.lock().map_err(|_| anyhow::anyhow!("database mutex poisoned"))?;
        f(&mut conn)
    }

    // ── Migrations ───────────────────────────────────────────────────────────

    fn migrate(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let has_version_table: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
                    [],
                    |row| row.get::<_, i64>(0),
                )
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_version_table {
                // Fresh database: full DDL at the current version.
                let tx = conn.transaction().context("opening bootstrap transaction")?;
                tx.execute_batch(schema::BASE_DDL).context("creating base schema")?;
                tx.execute_batch(schema::LOGS_DDL).context("creating logs schema")?;
                tx.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [schema::SCHEMA_VERSION],
                )
                .context("recording schema version")?;
                for (provider, pattern, input, output, cache_read) in schema::SEED_PRICING {
                    tx.execute(
                        "INSERT INTO model_pricing
                         (provider, model_pattern, input_per_mtok, output_per_mtok, cache_read_per_mtok)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![provider, pattern, input, output, cache_read],
                    )
                    .context("seeding pricing")?;
                }
                tx.commit().context("committing bootstrap")?;
                return Ok(());
            }

            let current: i64 = conn
                .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
                .context("reading schema version")?;

            for (target, apply) in schema::MIGRATIONS {
                if *target <= current {
                    continue;
                }
                let tx = conn.transaction().context("opening migration transaction")?;
                apply(&tx).map_err(|e| DbError::MigrationFailed {
                    from: target - 1,
                    to: *target,
                    cause: e.to_string(),
                })?;
                tx.execute("DELETE FROM schema_version", [])
                    .context("clearing schema version")?;
                tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [*target])
                    .context("recording schema version")?;
                tx.commit().map_err(|e| DbError::MigrationFailed {
                    from: target - 1,
                    to: *target,
                    cause: e.to_string(),
                })?;
            }
            Ok(())
        })
    }

    /// Current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version table cannot be read.
    pub fn schema_version(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
                .context("reading schema version")
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
