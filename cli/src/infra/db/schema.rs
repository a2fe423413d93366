//! Session database DDL and migrations.
//!
//! `BASE_DDL` creates the full current schema for fresh databases. Existing
//! databases are walked forward one version at a time through `MIGRATIONS`;
//! each entry records its target version inside the same transaction.

use anyhow::Result;
use rusqlite::Connection;

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 2;

/// Full DDL for a fresh database at `SCHEMA_VERSION`.
pub const BASE_DDL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    name TEXT NOT NULL,
    path TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
    UNIQUE (provider, name)
);

CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
    provider TEXT NOT NULL,
    provider_session_id TEXT NOT NULL,
    title TEXT,
    model TEXT,
    cwd TEXT,
    started_at TEXT,
    ended_at TEXT,
    turn_count INTEGER NOT NULL DEFAULT 0,
    total_input_tokens INTEGER NOT NULL DEFAULT 0,
    total_output_tokens INTEGER NOT NULL DEFAULT 0,
    total_cache_read_tokens INTEGER NOT NULL DEFAULT 0,
    total_cost_usd REAL NOT NULL DEFAULT 0,
    imported_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
    UNIQUE (provider, provider_session_id)
);

CREATE TABLE IF NOT EXISTS turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    turn_number INTEGER NOT NULL,
    user_message TEXT NOT NULL DEFAULT '',
    assistant_response TEXT NOT NULL DEFAULT '',
    model TEXT,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    cache_read_tokens INTEGER NOT NULL DEFAULT 0,
    cost_usd REAL NOT NULL DEFAULT 0,
    tools_used TEXT,
    created_at TEXT,
    UNIQUE (session_id, turn_number)
);
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id);

CREATE VIRTUAL TABLE IF NOT EXISTS turns_fts USING fts5(
    user_message,
    assistant_response,
    content='turns',
    content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS turns_ai AFTER INSERT ON turns BEGIN
    INSERT INTO turns_fts(rowid, user_message, assistant_response)
    VALUES (new.id, new.user_message, new.assistant_response);
END;
CREATE TRIGGER IF NOT EXISTS turns_ad AFTER DELETE ON turns BEGIN
    INSERT INTO turns_fts(turns_fts, rowid, user_message, assistant_response)
    VALUES ('delete', old.id, old.user_message, old.assistant_response);
END;
CREATE TRIGGER IF NOT EXISTS turns_au AFTER UPDATE ON turns BEGIN
    INSERT INTO turns_fts(turns_fts, rowid, user_message, assistant_response)
    VALUES ('delete', old.id, old.user_message, old.assistant_response);
    INSERT INTO turns_fts(rowid, user_message, assistant_response)
    VALUES (new.id, new.user_message, new.assistant_response);
END;

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS session_tags (
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (session_id, tag_id)
);

CREATE TABLE IF NOT EXISTS model_pricing (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    model_pattern TEXT NOT NULL,
    input_per_mtok REAL NOT NULL DEFAULT 0,
    output_per_mtok REAL NOT NULL DEFAULT 0,
    cache_read_per_mtok REAL NOT NULL DEFAULT 0,
    effective_from TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
    effective_until TEXT
);

CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    source TEXT NOT NULL,
    platform_arch TEXT,
    installed_at TEXT,
    recorded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
    UNIQUE (package_id, version)
);

CREATE TABLE IF NOT EXISTS package_deps (
    package_id INTEGER NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    depends_on TEXT NOT NULL,
    version TEXT,
    PRIMARY KEY (package_id, depends_on)
);

CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    command TEXT NOT NULL,
    package_id TEXT,
    status TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    error TEXT
);

CREATE TABLE IF NOT EXISTS artifacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER REFERENCES runs(id) ON DELETE SET NULL,
    url TEXT NOT NULL,
    path TEXT,
    sha256 TEXT,
    size_bytes INTEGER,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
);

CREATE TABLE IF NOT EXISTS lockfiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id TEXT NOT NULL UNIQUE,
    version TEXT NOT NULL,
    checksum TEXT NOT NULL,
    content TEXT,
    recorded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
);

CREATE TABLE IF NOT EXISTS secrets_meta (
    name TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    configured INTEGER NOT NULL DEFAULT 0,
    stack TEXT,
    required INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT
);
";

/// The observability event stream, added in schema version 2.
pub const LOGS_DDL: &str = "
CREATE TABLE IF NOT EXISTS logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    source TEXT NOT NULL,
    level TEXT NOT NULL,
    event_type TEXT NOT NULL,
    provider TEXT,
    session_id TEXT,
    terminal_id TEXT,
    duration_ms INTEGER,
    payload TEXT
);
CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);
CREATE INDEX IF NOT EXISTS idx_logs_source ON logs(source);
";

/// Default pricing rows, inserted once on fresh databases. Patterns use SQL
/// `LIKE` wildcards; lookup is exactness first, then longest pattern, then
/// most recent `effective_from`.
pub const SEED_PRICING: &[(&str, &str, f64, f64, f64)] = &[
    ("claude", "claude-sonnet-4-5-%", 3.0, 15.0, 0.3),
    ("claude", "claude-haiku-4-5-%", 0.8, 4.0, 0.08),
    ("claude", "claude-opus-4-%", 15.0, 75.0, 1.5),
    ("codex", "gpt-5%", 1.25, 10.0, 0.125),
    ("gemini", "gemini-2.5-pro%", 1.25, 10.0, 0.31),
    ("gemini", "gemini-2.5-flash%", 0.3, 2.5, 0.075),
];

/// Per-target-version transformer functions. Index 0 migrates to version 2.
pub type Migration = fn(&Connection) -> Result<()>;

/// Ordered migrations for existing databases: `(target_version, apply)`.
pub const MIGRATIONS: &[(i64, Migration)] = &[(2, migrate_v2_logs)];

fn migrate_v2_logs(conn: &Connection) -> Result<()> {
    conn.execute_batch(LOGS_DDL)?;
    Ok(())
}
