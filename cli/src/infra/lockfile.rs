//! Per-package YAML lockfiles.
//!
//! One file per installed package at `locks/<kind-plural>/<name>.lock.yaml`
//! recording the resolved identity and its dependencies. The checksum is a
//! short digest of the identifying fields, not a content hash — it detects
//! identity drift, not bit rot.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use agora_common::PackageKind;

use crate::infra::paths::AgoraPaths;

/// Lockfile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    pub id: String,
    pub version: String,
    pub name: String,
    pub installed_at: String,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<LockDependency>,
}

/// One resolved dependency as recorded in the lockfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockDependency {
    pub id: String,
    pub version: String,
    pub checksum: String,
}

/// Short hex digest of a package identity (`<id>@<version>`).
#[must_use]
pub fn entry_checksum(id: &str, version: &str) -> String {
    let digest = Sha256::digest(format!("{id}@{version}").as_bytes());
    format!("{digest:x}")[..12].to_string()
}

impl Lockfile {
    /// Build a lockfile for a package and its resolved dependencies.
    #[must_use]
    pub fn new(
        id: &str,
        name: &str,
        version: &str,
        installed_at: &str,
        dependencies: &[(String, String)],
    ) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            name: name.to_string(),
            installed_at: installed_at.to_string(),
            checksum: entry_checksum(id, version),
            dependencies: dependencies
                .iter()
                .map(|(dep_id, dep_version)| LockDependency {
                    id: dep_id.clone(),
                    version: dep_version.clone(),
                    checksum: entry_checksum(dep_id, dep_version),
                })
                .collect(),
        }
    }
}

/// Write a lockfile, creating the per-kind directory as needed.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_lockfile(
    paths: &AgoraPaths,
    kind: PackageKind,
    name: &str,
    lockfile: &Lockfile,
) -> Result<PathBuf> {
    let path = paths.lockfile(kind, name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let text = serde_yaml::to_string(lockfile).context("serializing lockfile")?;
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Read a package's lockfile, `None` when absent.
///
/// # Errors
///
/// Returns an error for unreadable or malformed files.
pub fn read_lockfile(
    paths: &AgoraPaths,
    kind: PackageKind,
    name: &str,
) -> Result<Option<Lockfile>> {
    let path = paths.lockfile(kind, name);
    if !path.is_file() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text)
        .map(Some)
        .with_context(|| format!("parsing {}", path.display()))
}

/// Remove a package's lockfile if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_lockfile(paths: &AgoraPaths, kind: PackageKind, name: &str) -> Result<()> {
    let path = paths.lockfile(kind, name);
    if path.is_file() {
        std::fs::remove_file(&path)
            .with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_short_stable_hex() {
        let a = entry_checksum("stack:demo", "1.0.0");
        let b = entry_checksum("stack:demo", "1.0.0");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, entry_checksum("stack:demo", "1.0.1"));
    }

    #[test]
    fn test_lockfile_round_trip_with_dependencies() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = AgoraPaths::with_home(tmp.path().join(".agora"));

        let lockfile = Lockfile::new(
            "stack:demo",
            "Demo",
            "1.0.0",
            "2025-06-01T00:00:00Z",
            &[
                ("runtime:node".to_string(), "20.11.1".to_string()),
                ("binary:ripgrep".to_string(), "14.1.0".to_string()),
            ],
        );
        let written = write_lockfile(&paths, PackageKind::Stack, "demo", &lockfile).expect("write");
        assert!(written.ends_with("locks/stacks/demo.lock.yaml"));

        let back = read_lockfile(&paths, PackageKind::Stack, "demo")
            .expect("read")
            .expect("present");
        assert_eq!(back.dependencies.len(), 2);
        assert_eq!(back.dependencies[0].id, "runtime:node");
        assert_eq!(back.checksum, entry_checksum("stack:demo", "1.0.0"));
    }

    #[test]
    fn test_remove_lockfile_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = AgoraPaths::with_home(tmp.path().join(".agora"));
        let lockfile = Lockfile::new("binary:rg", "rg", "1.0.0", "2025-06-01T00:00:00Z", &[]);
        write_lockfile(&paths, PackageKind::Binary, "rg", &lockfile).expect("write");

        remove_lockfile(&paths, PackageKind::Binary, "rg").expect("remove");
        remove_lockfile(&paths, PackageKind::Binary, "rg").expect("second remove");
        assert!(read_lockfile(&paths, PackageKind::Binary, "rg").expect("read").is_none());
    }
}
