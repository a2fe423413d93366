//! The per-install `manifest.json` record.
//!
//! Every installed package directory contains one of these; its absence
//! means the package is not installed. The central config and this record
//! must agree on `id`, `version`, and `installedAt`.

use serde::{Deserialize, Serialize};

use crate::package::PackageKind;

/// Where an install came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallSource {
    Registry,
    Local,
    Bundled,
    Npm,
    Pip,
    /// Written when a download failed so the registry state stays
    /// consistent; carries the error in `error`.
    Placeholder,
}

/// Contents of an install directory's `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledManifest {
    pub id: String,
    pub kind: PackageKind,
    pub name: String,
    pub version: String,
    /// ISO-8601 UTC.
    pub installed_at: String,
    pub source: InstallSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_arch: Option<String>,
    /// Command names this install exposes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<String>,
    /// Original directory for `source: local` installs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Download error for `source: placeholder` installs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstalledManifest {
    /// A minimal record for the given identity.
    #[must_use]
    pub fn new(
        id: &str,
        kind: PackageKind,
        name: &str,
        version: &str,
        installed_at: &str,
        source: InstallSource,
    ) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: name.to_string(),
            version: version.to_string(),
            installed_at: installed_at.to_string(),
            source,
            platform_arch: None,
            binaries: Vec::new(),
            source_path: None,
            error: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_serialises_camel_case() {
        let m = InstalledManifest::new(
            "binary:ripgrep",
            PackageKind::Binary,
            "ripgrep",
            "14.1.0",
            "2025-06-01T12:00:00Z",
            InstallSource::Registry,
        );
        let v = serde_json::to_value(&m).expect("serializes");
        assert_eq!(v["installedAt"], "2025-06-01T12:00:00Z");
        assert_eq!(v["source"], "registry");
        assert!(v.get("platformArch").is_none());
    }

    #[test]
    fn test_manifest_round_trips_placeholder_error() {
        let mut m = InstalledManifest::new(
            "runtime:node",
            PackageKind::Runtime,
            "node",
            "20.0.0",
            "2025-06-01T12:00:00Z",
            InstallSource::Placeholder,
        );
        m.error = Some("download failed: HTTP 503".to_string());
        let text = serde_json::to_string(&m).expect("serializes");
        let back: InstalledManifest = serde_json::from_str(&text).expect("parses");
        assert_eq!(back.source, InstallSource::Placeholder);
        assert_eq!(back.error.as_deref(), Some("download failed: HTTP 503"));
    }
}
