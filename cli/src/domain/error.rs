//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator. Each variant carries a stable code
//! that `--json` output preserves as a machine-readable tag.

use thiserror::Error;

// ── Registry and artifact errors ─────────────────────────────────────────────

/// Errors raised while talking to the registry or fetching artifacts.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry unavailable: remote fetch failed and no cached or local index exists.")]
    Unavailable,

    #[error("Download failed: {url}{}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    DownloadFailed { url: String, status: Option<u16> },

    #[error("Failed to extract {archive} as {archive_type}")]
    ExtractFailed { archive: String, archive_type: String },
}

impl RegistryError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Unavailable => "registry_unavailable",
            RegistryError::DownloadFailed { .. } => "download_failed",
            RegistryError::ExtractFailed { .. } => "extract_failed",
        }
    }
}

// ── Install errors ───────────────────────────────────────────────────────────

/// Errors raised by the resolver and installer.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Package '{0}' not found in the registry.")]
    PackageNotFound(String),

    #[error("Dependencies could not be installed: {}", missing.join(", "))]
    DependencyUnsatisfied { missing: Vec<String> },
}

impl InstallError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            InstallError::PackageNotFound(_) => "package_not_found",
            InstallError::DependencyUnsatisfied { .. } => "dependency_unsatisfied",
        }
    }
}

// ── Config store errors ──────────────────────────────────────────────────────

/// Errors raised by the central config store.
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Could not acquire the config lock within {waited_ms}ms. Another agora process may be running.")]
    LockContention { waited_ms: u64 },
}

impl ConfigStoreError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ConfigStoreError::LockContention { .. } => "lock_contention",
        }
    }
}

// ── Stack probe errors ───────────────────────────────────────────────────────

/// Errors raised while spawning and indexing MCP stacks. The tool indexer
/// captures these into cache records instead of propagating them.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("Secret '{name}' is required but not configured.")]
    SecretMissing { name: String },

    #[error("Failed to launch stack '{id}': {cause}")]
    SpawnError { id: String, cause: String },

    #[error("Stack '{id}' timed out after {ms}ms")]
    Timeout { id: String, ms: u64 },
}

impl StackError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            StackError::SecretMissing { .. } => "secret_missing",
            StackError::SpawnError { .. } => "stack_spawn_error",
            StackError::Timeout { .. } => "stack_timeout",
        }
    }
}

// ── Database errors ──────────────────────────────────────────────────────────

/// Errors raised by the session database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database migration {from} -> {to} failed: {cause}")]
    MigrationFailed { from: i64, to: i64, cause: String },
}

impl DbError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DbError::MigrationFailed { .. } => "db_migration_failed",
        }
    }
}

// ── Code extraction ──────────────────────────────────────────────────────────

/// Recover the stable code of the first taxonomy error found anywhere in
/// the error — root cause or attached context — defaulting to `internal`.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<agora_common::PackageError>().is_some() {
        return "invalid_package_id";
    }
    if err.downcast_ref::<agora_common::ManifestError>().is_some() {
        return "manifest_invalid";
    }
    if let Some(e) = err.downcast_ref::<InstallError>() {
        return e.code();
    }
    if let Some(e) = err.downcast_ref::<RegistryError>() {
        return e.code();
    }
    if let Some(e) = err.downcast_ref::<ConfigStoreError>() {
        return e.code();
    }
    if let Some(e) = err.downcast_ref::<StackError>() {
        return e.code();
    }
    if let Some(e) = err.downcast_ref::<DbError>() {
        return e.code();
    }
    "internal"
}

// ── Unit tests ───────────────────────────────────────────────────────────────
