//! Aggregate statistics and the install-state mirror.
//!
//! `stats` summarises imported sessions per provider. The mirror tables
//! (`packages`, `package_deps`, `lockfiles`) copy the file-system install
//! state into the database for historical reporting; they are refreshed by
//! the `sessions import` command, never by the installer itself.

use anyhow::{Context, Result};
use serde::Serialize;

use agora_common::InstalledManifest;

use super::SessionDb;
use crate::infra::lockfile::Lockfile;

/// Per-provider session totals.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    pub provider: String,
    pub sessions: i64,
    pub turns: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_read_tokens: i64,
    pub cost_usd: f64,
}

impl SessionDb {
    /// Session totals grouped by provider, largest session count first.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn stats(&self) -> Result<Vec<ProviderStats>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT provider,
                            COUNT(*),
                            COALESCE(SUM(turn_count), 0),
                            COALESCE(SUM(total_input_tokens), 0),
                            COALESCE(SUM(total_output_tokens), 0),
                            COALESCE(SUM(total_cache_read_tokens), 0),
                            COALESCE(SUM(total_cost_usd), 0)
                     FROM sessions
                     GROUP BY provider
                     ORDER BY COUNT(*) DESC, provider",
                )
                .context("preparing stats query")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ProviderStats {
                        provider: row.get(0)?,
                        sessions: row.get(1)?,
                        turns: row.get(2)?,
                        input_tokens: row.get(3)?,
                        output_tokens: row.get(4)?,
                        cache_read_tokens: row.get(5)?,
                        cost_usd: row.get(6)?,
                    })
                })
                .context("running stats query")?;
            rows.collect::<Result<Vec<_>, _>>().context("reading stats rows")
        })
    }

    /// Mirror one installed package (and its lockfile dependencies) into
    /// the reporting tables. Idempotent per `(id, version)`.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn mirror_install(
        &self,
        manifest: &InstalledManifest,
        lockfile: Option<&Lockfile>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO packages
                 (package_id, kind, name, version, source, platform_arch, installed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    manifest.id,
                    manifest.kind.as_str(),
                    manifest.name,
                    manifest.version,
                    serde_json::to_value(manifest.source)
                        .ok()
                        .and_then(|v| v.as_str().map(ToString::to_string))
                        .unwrap_or_else(|| "registry".to_string()),
                    manifest.platform_arch,
                    manifest.installed_at,
                ],
            )
            .context("mirroring package")?;

            let row_id: i64 = conn
                .query_row(
                    "SELECT id FROM packages WHERE package_id = ?1 AND version = ?2",
                    rusqlite::params![manifest.id, manifest.version],
                    |row| row.get(0),
                )
                .context("resolving mirrored package id")?;

            if let Some(lockfile) = lockfile {
                for dep in &lockfile.dependencies {
                    conn.execute(
                        "INSERT OR REPLACE INTO package_deps (package_id, depends_on, version)
                         VALUES (?1, ?2, ?3)",
                        rusqlite::params![row_id, dep.id, dep.version],
                    )
                    .context("mirroring dependency")?;
                }
                conn.execute(
                    "INSERT OR REPLACE INTO lockfiles (package_id, version, checksum, content)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        manifest.id,
                        lockfile.version,
                        lockfile.checksum,
                        serde_yaml::to_string(lockfile).ok(),
                    ],
                )
                .context("mirroring lockfile")?;
            }
            Ok(())
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
