//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `agora_common` — never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use agora_common::{PackageDescriptor, PackageKind};

use crate::domain::config::CachedTool;
use crate::domain::launch::LaunchConfig;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution (`npm`, `pip`, `tar`, `unzip`) so
/// infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds
    /// `timeout`. On timeout, the child process must be killed (not left
    /// orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;

    /// Run a program with an explicit working directory.
    async fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Phases emitted while a package moves through the install pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Resolving,
    Downloading,
    Extracting,
    Installing,
    Lockfile,
    Installed,
}

impl InstallPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InstallPhase::Resolving => "resolving",
            InstallPhase::Downloading => "downloading",
            InstallPhase::Extracting => "extracting",
            InstallPhase::Installing => "installing",
            InstallPhase::Lockfile => "lockfile",
            InstallPhase::Installed => "installed",
        }
    }
}

/// One progress event. Consumers may ignore them entirely.
#[derive(Debug, Clone)]
pub struct InstallEvent {
    pub phase: InstallPhase,
    pub package: String,
    pub current: Option<usize>,
    pub total: Option<usize>,
    pub message: Option<String>,
}

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// Emit a structured install event. Defaults to a no-op.
    fn event(&self, _event: &InstallEvent) {}
}

// ── Package Source Port ───────────────────────────────────────────────────────

/// A descriptor with the kind it was found under.
#[derive(Debug, Clone)]
pub struct FoundPackage {
    pub kind: PackageKind,
    pub descriptor: PackageDescriptor,
}

/// Abstracts registry lookups so the resolver can be tested against a
/// canned index.
pub trait PackageSource {
    /// Look up `kind:name` or a bare `name` (scanning all kinds).
    ///
    /// # Errors
    ///
    /// Returns an error only for malformed ids; an absent package is `None`.
    fn get_package(&self, id: &str) -> Result<Option<FoundPackage>>;
}

// ── Secret Store Port ─────────────────────────────────────────────────────────

/// Abstracts the secret value backend (keychain, `secrets.json`, ...). The
/// core only ever reads values to export into stack subprocesses.
pub trait SecretStore {
    /// Fetch a secret value, `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Store a secret value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, name: &str, value: &str) -> Result<()>;
}

// ── Stack Probe Port ──────────────────────────────────────────────────────────

/// Abstracts the MCP handshake against a launched stack so the tool-index
/// service can be tested without real subprocesses.
#[allow(async_fn_in_trait)]
pub trait StackProber {
    /// Spawn the stack, perform the handshake, and return its tools.
    ///
    /// # Errors
    ///
    /// Returns `StackError::SpawnError` or `StackError::Timeout` (wrapped in
    /// `anyhow::Error`); the caller records these per stack instead of
    /// propagating.
    async fn probe(
        &self,
        stack_id: &str,
        launch: &LaunchConfig,
        env: &BTreeMap<String, String>,
    ) -> Result<Vec<CachedTool>>;
}
