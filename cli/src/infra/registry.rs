//! Registry client — index fetch, cache, and package lookup.
//!
//! The index comes from one of three places, in priority order: a local
//! development index (`USE_LOCAL_REGISTRY=true`), the on-disk HTTP cache
//! when it is younger than 24 hours, and finally the network. A network
//! failure falls back to the local index when present; with neither
//! available the load fails with `RegistryError::Unavailable`.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use agora_common::{PackageKind, RegistryIndex, SearchHit};

use crate::application::ports::{FoundPackage, PackageSource};
use crate::domain::error::RegistryError;
use crate::infra::paths::AgoraPaths;

/// Default index location. Overridable via `AGORA_REGISTRY_URL`.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/agoradev/registry/main/index.json";

/// How long the HTTP cache stays fresh.
const CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Recommended timeout for registry HTTP requests.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// A loaded registry index bound to the directory layout it was read from.
pub struct RegistryClient {
    paths: AgoraPaths,
    index: RegistryIndex,
}

impl RegistryClient {
    /// Load the index, consulting local override, cache, and network in
    /// that order. `force_refresh` skips the cache-age check.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unavailable` when every source fails.
    pub fn load(paths: &AgoraPaths, force_refresh: bool) -> Result<Self> {
        let index = fetch_index(paths, force_refresh)?;
        Ok(Self { paths: paths.clone(), index })
    }

    /// Build a client around an already-parsed index (tests).
    #[must_use]
    pub fn with_index(paths: &AgoraPaths, index: RegistryIndex) -> Self {
        Self { paths: paths.clone(), index }
    }

    #[must_use]
    pub fn index(&self) -> &RegistryIndex {
        &self.index
    }

    #[must_use]
    pub fn paths(&self) -> &AgoraPaths {
        &self.paths
    }

    /// Case-insensitive substring search, optionally narrowed to one kind.
    #[must_use]
    pub fn search(&self, query: &str, kind: Option<PackageKind>) -> Vec<SearchHit> {
        self.index.search(query, kind)
    }
}

impl PackageSource for RegistryClient {
    fn get_package(&self, id: &str) -> Result<Option<FoundPackage>> {
        match id.split_once(':') {
            Some((prefix, name)) => {
                let kind = PackageKind::parse(prefix).ok_or_else(|| {
                    agora_common::PackageError::InvalidPackageId(id.to_string())
                })?;
                Ok(self.index.find(kind, name).map(|d| FoundPackage {
                    kind,
                    descriptor: d.clone(),
                }))
            }
            None => {
                for kind in PackageKind::ALL {
                    if let Some(d) = self.index.find(kind, id) {
                        return Ok(Some(FoundPackage { kind, descriptor: d.clone() }));
                    }
                }
                Ok(None)
            }
        }
    }
}

// ── Index sourcing ───────────────────────────────────────────────────────────

/// Path of the local development index, when the override is enabled.
fn local_index_path() -> Option<PathBuf> {
    if std::env::var("USE_LOCAL_REGISTRY").as_deref() != Ok("true") {
        return None;
    }
    let path = std::env::var("AGORA_LOCAL_REGISTRY")
        .map_or_else(|_| PathBuf::from("registry/index.json"), PathBuf::from);
    Some(path)
}

fn registry_url() -> String {
    std::env::var("AGORA_REGISTRY_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string())
}

fn mtime(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_index(path: &std::path::Path) -> Result<RegistryIndex> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn fetch_index(paths: &AgoraPaths, force_refresh: bool) -> Result<RegistryIndex> {
    let cache = paths.registry_cache();
    let local = local_index_path().filter(|p| p.is_file());

    // A local index wins when it is newer than the cache or a refresh was
    // forced.
    if let Some(local_path) = &local {
        let newer = match (mtime(local_path), mtime(&cache)) {
            (Some(l), Some(c)) => l >= c,
            (Some(_), None) => true,
            _ => false,
        };
        if force_refresh || newer {
            return read_index(local_path);
        }
    }

    if !force_refresh {
        if let Some(modified) = mtime(&cache) {
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO);
            if age <= CACHE_MAX_AGE {
                if let Ok(index) = read_index(&cache) {
                    return Ok(index);
                }
            }
        }
    }

    match fetch_remote(&cache) {
        Ok(index) => Ok(index),
        Err(_) => match &local {
            Some(local_path) => read_index(local_path),
            None => Err(RegistryError::Unavailable.into()),
        },
    }
}

fn fetch_remote(cache: &std::path::Path) -> Result<RegistryIndex> {
    let url = registry_url();
    let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
    let body = match agent
        .get(&url)
        .set("Accept", "application/json")
        .set("User-Agent", "agora-cli")
        .call()
    {
        Ok(resp) => resp.into_string().context("reading registry response")?,
        Err(ureq::Error::Status(code, _)) => {
            return Err(RegistryError::DownloadFailed { url, status: Some(code) }.into());
        }
        Err(_) => {
            return Err(RegistryError::DownloadFailed { url, status: None }.into());
        }
    };

    let index: RegistryIndex =
        serde_json::from_str(&body).context("parsing registry index")?;

    if let Some(parent) = cache.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(cache, &body).with_context(|| format!("writing {}", cache.display()))?;

    Ok(index)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
