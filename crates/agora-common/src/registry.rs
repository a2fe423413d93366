//! Registry index schema.
//!
//! The registry is a single JSON document keyed by pluralised kind, each
//! bucket split into `official` and `community` descriptor arrays. These
//! types mirror that document byte-for-byte; unknown descriptor fields are
//! preserved so a cached index can be re-written without loss.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::package::{strip_kind_prefix, PackageKind};

// ── Index document ───────────────────────────────────────────────────────────

/// Top-level registry index: `{packages: {stacks: {...}, prompts: {...}, ...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryIndex {
    #[serde(default)]
    pub packages: PackageBuckets,
}

/// One bucket per pluralised kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageBuckets {
    pub stacks: KindBucket,
    pub prompts: KindBucket,
    pub runtimes: KindBucket,
    pub binaries: KindBucket,
    pub agents: KindBucket,
}

/// Official and community descriptor lists for one kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KindBucket {
    pub official: Vec<PackageDescriptor>,
    pub community: Vec<PackageDescriptor>,
}

impl RegistryIndex {
    /// The bucket for one kind.
    #[must_use]
    pub fn bucket(&self, kind: PackageKind) -> &KindBucket {
        match kind {
            PackageKind::Stack => &self.packages.stacks,
            PackageKind::Prompt => &self.packages.prompts,
            PackageKind::Runtime => &self.packages.runtimes,
            PackageKind::Binary => &self.packages.binaries,
            PackageKind::Agent => &self.packages.agents,
        }
    }

    /// Iterate all descriptors of one kind, official first.
    pub fn descriptors(&self, kind: PackageKind) -> impl Iterator<Item = &PackageDescriptor> {
        let bucket = self.bucket(kind);
        bucket.official.iter().chain(bucket.community.iter())
    }

    /// Look up a descriptor by exact id or prefix-stripped name within one kind.
    #[must_use]
    pub fn find(&self, kind: PackageKind, name: &str) -> Option<&PackageDescriptor> {
        self.descriptors(kind)
            .find(|d| d.id == name || strip_kind_prefix(&d.id) == name)
    }

    /// Case-insensitive substring search over id, name, description, and tags.
    ///
    /// With `kind = None` all kinds are searched in the fixed order of
    /// `PackageKind::ALL`.
    #[must_use]
    pub fn search(&self, query: &str, kind: Option<PackageKind>) -> Vec<SearchHit> {
        let needle = query.to_lowercase();
        let kinds: Vec<PackageKind> = match kind {
            Some(k) => vec![k],
            None => PackageKind::ALL.to_vec(),
        };

        let mut hits = Vec::new();
        for k in kinds {
            for desc in self.descriptors(k) {
                let haystack = format!(
                    "{} {} {} {}",
                    desc.id,
                    desc.name,
                    desc.description.as_deref().unwrap_or_default(),
                    desc.tags.join(" ")
                )
                .to_lowercase();
                if haystack.contains(&needle) {
                    hits.push(SearchHit { kind: k, descriptor: desc.clone() });
                }
            }
        }
        hits
    }
}

/// A search result with the kind it was found under.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub kind: PackageKind,
    #[serde(flatten)]
    pub descriptor: PackageDescriptor,
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// One registry entry. Install hints are all optional; the installer picks a
/// strategy from whichever are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageDescriptor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered, search-visible tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Registry-relative source location for catalog packages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    // Install hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npm_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pip_package: Option<String>,
    /// Single exported command name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    /// Multiple exported command names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<String>,
    /// `<os>-<arch>` → ordered download entries.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub downloads: BTreeMap<String, Vec<DownloadSpec>>,
    /// Legacy single-URL variant, keyed by platform tag.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub upstream: BTreeMap<String, String>,
    /// Legacy extraction type per platform tag, paired with `upstream`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extract: BTreeMap<String, String>,
    /// Runtime pre-release marker: fetch `<name>-<ver>-<platform>.tar.gz`
    /// from the release base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_runtime: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<Requires>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl PackageDescriptor {
    /// All command names this package exports, merging the singular and
    /// plural hint fields.
    #[must_use]
    pub fn exported_binaries(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(b) = &self.binary {
            out.push(b.clone());
        }
        for b in &self.binaries {
            if !out.contains(b) {
                out.push(b.clone());
            }
        }
        out
    }
}

/// One entry in a `downloads[platform]` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSpec {
    pub url: String,
    /// Archive type: `zip`, `tar.gz`, `tgz`, or `tar.xz`. Inferred from the
    /// URL when absent.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub archive_type: Option<String>,
    /// Path of the binary to relocate out of the extracted tree. `*`
    /// segments match any single path component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    /// Expected SHA-256 of the archive, verified when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

// ── Dependency declarations ──────────────────────────────────────────────────

/// A descriptor's dependency declaration. Entries are package-id references
/// that may appear unprefixed; the resolver normalises each to its kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Requires {
    pub runtimes: Vec<String>,
    pub binaries: Vec<String>,
    pub agents: Vec<String>,
    /// Legacy singleton form of `runtimes`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Legacy name for `binaries`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

impl Requires {
    /// Dependencies grouped with the kind each entry normalises to, legacy
    /// fields folded in, order preserved.
    #[must_use]
    pub fn entries(&self) -> Vec<(PackageKind, String)> {
        let mut out = Vec::new();
        for r in self.runtime.iter().chain(self.runtimes.iter()) {
            out.push((PackageKind::Runtime, r.clone()));
        }
        for b in self.binaries.iter().chain(self.tools.iter()) {
            out.push((PackageKind::Binary, b.clone()));
        }
        for a in &self.agents {
            out.push((PackageKind::Agent, a.clone()));
        }
        out
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn demo_index() -> RegistryIndex {
        serde_json::from_value(serde_json::json!({
            "packages": {
                "stacks": {
                    "official": [{
                        "id": "github-tools",
                        "name": "GitHub Tools",
                        "version": "1.2.0",
                        "description": "Issue and PR helpers",
                        "tags": ["github", "vcs"],
                        "path": "stacks/github-tools",
                        "requires": {"runtimes": ["node"], "binaries": ["ripgrep"]}
                    }],
                    "community": []
                },
                "binaries": {
                    "official": [{
                        "id": "binary:ripgrep",
                        "name": "ripgrep",
                        "binary": "rg",
                        "downloads": {
                            "linux-x64": [{"url": "https://example.com/rg.tar.gz", "binary": "rg"}]
                        }
                    }],
                    "community": []
                }
            }
        }))
        .expect("valid index")
    }

    // ── find ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_find_matches_bare_descriptor_id() {
        let index = demo_index();
        assert!(index.find(PackageKind::Stack, "github-tools").is_some());
    }

    #[test]
    fn test_find_strips_descriptor_kind_prefix() {
        let index = demo_index();
        let hit = index.find(PackageKind::Binary, "ripgrep").expect("found");
        assert_eq!(hit.id, "binary:ripgrep");
    }

    #[test]
    fn test_find_misses_wrong_kind() {
        let index = demo_index();
        assert!(index.find(PackageKind::Runtime, "ripgrep").is_none());
    }

    // ── search ───────────────────────────────────────────────────────────────

    #[test]
    fn test_search_matches_tags_case_insensitively() {
        let index = demo_index();
        let hits = index.search("VCS", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, PackageKind::Stack);
    }

    #[test]
    fn test_search_kind_filter_excludes_other_kinds() {
        let index = demo_index();
        assert!(index.search("ripgrep", Some(PackageKind::Stack)).is_empty());
        assert_eq!(index.search("ripgrep", Some(PackageKind::Binary)).len(), 1);
    }

    #[test]
    fn test_search_matches_description_substring() {
        let index = demo_index();
        assert_eq!(index.search("PR helpers", None).len(), 1);
    }

    // ── requires ─────────────────────────────────────────────────────────────

    #[test]
    fn test_requires_entries_normalise_kinds_in_order() {
        let index = demo_index();
        let desc = index.find(PackageKind::Stack, "github-tools").expect("found");
        let entries = desc.requires.as_ref().expect("requires").entries();
        assert_eq!(
            entries,
            vec![
                (PackageKind::Runtime, "node".to_string()),
                (PackageKind::Binary, "ripgrep".to_string()),
            ]
        );
    }

    #[test]
    fn test_requires_legacy_singletons_fold_in() {
        let req: Requires = serde_json::from_value(serde_json::json!({
            "runtime": "python",
            "tools": ["ffmpeg"]
        }))
        .expect("valid requires");
        assert_eq!(
            req.entries(),
            vec![
                (PackageKind::Runtime, "python".to_string()),
                (PackageKind::Binary, "ffmpeg".to_string()),
            ]
        );
    }

    // ── descriptor round-trip ────────────────────────────────────────────────

    #[test]
    fn test_descriptor_preserves_unknown_fields() {
        let raw = serde_json::json!({
            "id": "stack:x", "name": "x",
            "homepage": "https://example.com"
        });
        let desc: PackageDescriptor = serde_json::from_value(raw).expect("valid");
        let back = serde_json::to_value(&desc).expect("serializes");
        assert_eq!(back["homepage"], "https://example.com");
    }
}
