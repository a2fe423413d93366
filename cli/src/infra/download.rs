//! Artifact acquisition: HTTP downloads, archive extraction, binary
//! relocation, and hash verification.
//!
//! Three strategies cover the registry's descriptor shapes: the
//! multi-download map, the legacy single-URL form, and runtime pre-release
//! tarballs. Extraction shells out to `tar`/`unzip` through the
//! `CommandRunner` port; gzipped tarballs are validated against path
//! traversal before any entry touches disk. Temp files live in a
//! `tempfile::TempDir` and disappear on failure.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use agora_common::{InstallSource, InstalledManifest, PackageDescriptor, PackageKind};

use crate::application::ports::{CommandRunner, InstallEvent, InstallPhase, ProgressReporter};
use crate::domain::error::RegistryError;
use crate::infra::paths::{platform_arch, AgoraPaths};
use crate::infra::registry::HTTP_TIMEOUT;

/// Base URL for runtime pre-release tarballs
/// (`<runtime>-<shortVersion>-<platform>.tar.gz`).
pub const RUNTIME_RELEASE_BASE: &str =
    "https://github.com/agoradev/runtimes/releases/download/current";

/// Base URL of the registry repository contents API, for stack/prompt
/// source downloads. Overridable via `AGORA_REGISTRY_CONTENTS_URL`.
pub const DEFAULT_CONTENTS_URL: &str =
    "https://api.github.com/repos/agoradev/registry/contents";

/// Optional files fetched alongside a stack's required `manifest.json`.
const OPTIONAL_SOURCE_FILES: [&str; 4] =
    ["package.json", ".env.example", "tsconfig.json", "requirements.txt"];

/// Source subdirectories downloaded recursively when present.
const SOURCE_DIRS: [&str; 5] = ["src", "dist", "node", "python", "lib"];

/// Downloads and extracts registry artifacts into the layout.
pub struct Downloader<'a, R: CommandRunner> {
    paths: &'a AgoraPaths,
    runner: &'a R,
}

impl<'a, R: CommandRunner> Downloader<'a, R> {
    #[must_use]
    pub fn new(paths: &'a AgoraPaths, runner: &'a R) -> Self {
        Self { paths, runner }
    }

    // ── Tarball/archive strategies ───────────────────────────────────────────

    /// Install a runtime or binary package from its descriptor, selecting
    /// the strategy by descriptor shape. Writes the install `manifest.json`
    /// and returns it.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DownloadFailed` / `ExtractFailed` on
    /// acquisition problems, or a plain error when the descriptor has no
    /// download for the host platform.
    pub async fn download_package(
        &self,
        descriptor: &PackageDescriptor,
        kind: PackageKind,
        name: &str,
        reporter: &impl ProgressReporter,
    ) -> Result<InstalledManifest> {
        let platform = platform_arch();
        let install_dir = self.paths.install_dir(kind, name);
        std::fs::create_dir_all(&install_dir)
            .with_context(|| format!("creating {}", install_dir.display()))?;

        reporter.event(&InstallEvent {
            phase: InstallPhase::Downloading,
            package: descriptor.id.clone(),
            current: None,
            total: None,
            message: None,
        });

        if let Some(entries) = descriptor.downloads.get(&platform) {
            self.multi_download(entries, &install_dir, reporter).await?;
        } else if let Some(url) = descriptor.upstream.get(&platform) {
            let spec = agora_common::DownloadSpec {
                url: url.clone(),
                archive_type: descriptor.extract.get(&platform).cloned(),
                binary: descriptor.binary.clone(),
                sha256: None,
            };
            self.multi_download(std::slice::from_ref(&spec), &install_dir, reporter)
                .await?;
        } else if descriptor.download_runtime == Some(true) {
            self.download_runtime_release(descriptor, name, &install_dir, reporter)
                .await?;
        } else {
            anyhow::bail!("no download available for platform {platform}");
        }

        // Every declared binary in the install root becomes executable.
        for binary in descriptor.exported_binaries() {
            let path = install_dir.join(&binary);
            if path.is_file() {
                make_executable(&path)?;
            }
        }

        let mut manifest = InstalledManifest::new(
            &format!("{kind}:{name}"),
            kind,
            name,
            descriptor.version.as_deref().unwrap_or("0.0.0"),
            &now_iso(),
            InstallSource::Registry,
        );
        manifest.platform_arch = Some(platform);
        manifest.binaries = descriptor.exported_binaries();
        write_manifest(&install_dir, &manifest)?;
        Ok(manifest)
    }

    /// Multi-download strategy: one fetch per unique URL, extraction per
    /// declared type, then binary relocation. Entries repeating a URL reuse
    /// the already-extracted content.
    async fn multi_download(
        &self,
        entries: &[agora_common::DownloadSpec],
        install_dir: &Path,
        reporter: &impl ProgressReporter,
    ) -> Result<()> {
        std::fs::create_dir_all(self.paths.downloads_dir())
            .context("creating downloads cache")?;
        let tmp = tempfile::tempdir_in(self.paths.downloads_dir())
            .context("creating download temp dir")?;

        let mut extracted: BTreeMap<String, PathBuf> = BTreeMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let extract_dir = match extracted.get(&entry.url) {
                Some(dir) => dir.clone(),
                None => {
                    let work = tmp.path().join(format!("dl-{i}"));
                    std::fs::create_dir_all(&work)
                        .with_context(|| format!("creating {}", work.display()))?;
                    let archive = work.join(file_name_from_url(&entry.url));
                    self.http_download(&entry.url, &archive)?;
                    if let Some(expected) = &entry.sha256 {
                        verify_hash(&archive, expected)?;
                    }

                    let archive_type = entry
                        .archive_type
                        .clone()
                        .unwrap_or_else(|| infer_archive_type(&entry.url).to_string());
                    reporter.event(&InstallEvent {
                        phase: InstallPhase::Extracting,
                        package: entry.url.clone(),
                        current: None,
                        total: None,
                        message: Some(archive_type.clone()),
                    });

                    let dest = work.join("extracted");
                    std::fs::create_dir_all(&dest)
                        .with_context(|| format!("creating {}", dest.display()))?;
                    self.extract_archive(&archive, &archive_type, &dest, false)
                        .await?;
                    extracted.insert(entry.url.clone(), dest.clone());
                    dest
                }
            };

            if let Some(binary) = &entry.binary {
                let found = resolve_glob(&extract_dir, binary).ok_or_else(|| {
                    anyhow::anyhow!("binary '{binary}' not found in extracted archive")
                })?;
                let target = install_dir.join(final_component(binary));
                relocate(&found, &target)?;
            }
        }
        Ok(())
    }

    /// Runtime pre-release strategy: fetch
    /// `<runtime>-<shortVersion>-<platform>.tar.gz`, extract with the top
    /// directory stripped, and write `runtime.json` metadata.
    async fn download_runtime_release(
        &self,
        descriptor: &PackageDescriptor,
        name: &str,
        install_dir: &Path,
        reporter: &impl ProgressReporter,
    ) -> Result<()> {
        let platform = platform_arch();
        let version = descriptor.version.as_deref().unwrap_or("0.0.0");
        let short = short_version(version);
        let url = format!("{}/{name}-{short}-{platform}.tar.gz", runtime_release_base());

        std::fs::create_dir_all(self.paths.downloads_dir())
            .context("creating downloads cache")?;
        let tmp = tempfile::tempdir_in(self.paths.downloads_dir())
            .context("creating download temp dir")?;
        let archive = tmp.path().join(file_name_from_url(&url));
        self.http_download(&url, &archive)?;

        reporter.event(&InstallEvent {
            phase: InstallPhase::Extracting,
            package: format!("runtime:{name}"),
            current: None,
            total: None,
            message: None,
        });
        self.extract_archive(&archive, "tar.gz", install_dir, true).await?;

        let metadata = serde_json::json!({
            "name": name,
            "version": version,
            "platformArch": platform,
            "installedAt": now_iso(),
        });
        std::fs::write(
            install_dir.join("runtime.json"),
            serde_json::to_string_pretty(&metadata).context("serializing runtime.json")?,
        )
        .context("writing runtime.json")?;
        Ok(())
    }

    // ── Source-directory downloads ───────────────────────────────────────────

    /// Download a stack/prompt source tree from the registry repository.
    ///
    /// A `*.md` catalog path is a single-file prompt, fetched verbatim to
    /// `prompts/<name>.md`. Directory sources require `manifest.json` and
    /// pull the optional project files plus any of the conventional source
    /// subdirectories that exist.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DownloadFailed` on fetch problems and a
    /// plain error when the descriptor has no catalog path.
    pub async fn download_source(
        &self,
        descriptor: &PackageDescriptor,
        kind: PackageKind,
        name: &str,
    ) -> Result<PathBuf> {
        let catalog_path = descriptor
            .path
            .as_deref()
            .with_context(|| format!("descriptor '{}' has no registry path", descriptor.id))?;

        if catalog_path.ends_with(".md") {
            std::fs::create_dir_all(self.paths.prompts()).context("creating prompts dir")?;
            let dest = self.paths.prompt_file(name);
            let listing = self.contents_entry(catalog_path)?;
            let download_url = listing
                .download_url
                .as_deref()
                .with_context(|| format!("no download url for {catalog_path}"))?;
            self.http_download(download_url, &dest)?;
            return Ok(dest);
        }

        let install_dir = self.paths.install_dir(kind, name);
        std::fs::create_dir_all(&install_dir)
            .with_context(|| format!("creating {}", install_dir.display()))?;

        let entries = self.list_contents(catalog_path)?;
        let manifest_entry = entries
            .iter()
            .find(|e| e.name == "manifest.json")
            .with_context(|| format!("'{catalog_path}' has no manifest.json"))?;
        self.fetch_entry(manifest_entry, &install_dir)?;

        for entry in &entries {
            if OPTIONAL_SOURCE_FILES.contains(&entry.name.as_str()) {
                self.fetch_entry(entry, &install_dir)?;
            }
        }
        for entry in &entries {
            if entry.entry_type == "dir" && SOURCE_DIRS.contains(&entry.name.as_str()) {
                self.download_tree(&entry.path, &install_dir.join(&entry.name))?;
            }
        }
        Ok(install_dir)
    }

    fn download_tree(&self, catalog_path: &str, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;
        for entry in self.list_contents(catalog_path)? {
            if entry.entry_type == "dir" {
                self.download_tree(&entry.path, &dest.join(&entry.name))?;
            } else {
                self.fetch_entry(&entry, dest)?;
            }
        }
        Ok(())
    }

    fn fetch_entry(&self, entry: &ContentsEntry, dest_dir: &Path) -> Result<()> {
        let url = entry
            .download_url
            .as_deref()
            .with_context(|| format!("no download url for {}", entry.path))?;
        self.http_download(url, &dest_dir.join(&entry.name))
    }

    fn list_contents(&self, catalog_path: &str) -> Result<Vec<ContentsEntry>> {
        let url = format!("{}/{catalog_path}", contents_base());
        let body = self.http_get_string(&url)?;
        serde_json::from_str(&body).with_context(|| format!("parsing listing of {catalog_path}"))
    }

    fn contents_entry(&self, catalog_path: &str) -> Result<ContentsEntry> {
        let url = format!("{}/{catalog_path}", contents_base());
        let body = self.http_get_string(&url)?;
        serde_json::from_str(&body).with_context(|| format!("parsing entry {catalog_path}"))
    }

    // ── HTTP plumbing ────────────────────────────────────────────────────────

    fn http_get_string(&self, url: &str) -> Result<String> {
        let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
        match agent
            .get(url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "agora-cli")
            .call()
        {
            Ok(resp) => resp.into_string().context("reading response body"),
            Err(ureq::Error::Status(code, _)) => Err(RegistryError::DownloadFailed {
                url: url.to_string(),
                status: Some(code),
            }
            .into()),
            Err(_) => Err(RegistryError::DownloadFailed { url: url.to_string(), status: None }.into()),
        }
    }

    fn http_download(&self, url: &str, dest: &Path) -> Result<()> {
        let agent = ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build();
        let resp = match agent.get(url).set("User-Agent", "agora-cli").call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(RegistryError::DownloadFailed {
                    url: url.to_string(),
                    status: Some(code),
                }
                .into());
            }
            Err(_) => {
                return Err(
                    RegistryError::DownloadFailed { url: url.to_string(), status: None }.into()
                );
            }
        };

        let mut reader = resp.into_reader();
        let mut file = std::fs::File::create(dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        if let Err(e) = std::io::copy(&mut reader, &mut file) {
            drop(file);
            let _ = std::fs::remove_file(dest);
            return Err(anyhow::Error::from(e).context(format!("downloading {url}")));
        }
        Ok(())
    }

    // ── Extraction ───────────────────────────────────────────────────────────

    async fn extract_archive(
        &self,
        archive: &Path,
        archive_type: &str,
        dest: &Path,
        strip_top: bool,
    ) -> Result<()> {
        let archive_str = archive.to_string_lossy().to_string();
        let dest_str = dest.to_string_lossy().to_string();
        let fail = || RegistryError::ExtractFailed {
            archive: archive
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| archive_str.clone()),
            archive_type: archive_type.to_string(),
        };

        let output = match archive_type {
            "tar.gz" | "tgz" => {
                validate_tarball_paths(archive)?;
                let mut args = vec!["-xzf", archive_str.as_str(), "-C", dest_str.as_str()];
                if strip_top {
                    args.push("--strip-components=1");
                }
                self.runner.run("tar", &args).await
            }
            "tar.xz" => {
                let mut args = vec!["-xJf", archive_str.as_str(), "-C", dest_str.as_str()];
                if strip_top {
                    args.push("--strip-components=1");
                }
                self.runner.run("tar", &args).await
            }
            "zip" => {
                self.runner
                    .run("unzip", &["-o", "-q", &archive_str, "-d", &dest_str])
                    .await
            }
            _ => return Err(fail().into()),
        };

        let output = output.map_err(|_| fail())?;
        if !output.status.success() {
            return Err(fail().into());
        }
        Ok(())
    }
}

// ── Tarball validation ───────────────────────────────────────────────────────

/// Validate that a gzipped tarball contains no path traversal entries.
///
/// Checks every entry name for `..` components or absolute paths before the
/// archive is handed to `tar` for extraction.
///
/// # Errors
///
/// Returns an error if the tarball cannot be read or any entry escapes the
/// extraction root.
pub fn validate_tarball_paths(tar_path: &Path) -> Result<()> {
    let file = std::fs::File::open(tar_path)
        .with_context(|| format!("opening {}", tar_path.display()))?;
    let gz = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(gz);
    for entry in archive.entries().context("reading tarball entries")? {
        let entry = entry.context("reading tarball entry")?;
        let path = entry.path().context("reading tarball entry path")?;
        let path_str = path.to_string_lossy();
        if path_str.starts_with('/') {
            anyhow::bail!("tarball contains absolute path entry: {path_str}");
        }
        for component in path.components() {
            if component == std::path::Component::ParentDir {
                anyhow::bail!("tarball contains path traversal entry: {path_str}");
            }
        }
    }
    Ok(())
}

// ── Hashing ──────────────────────────────────────────────────────────────────

/// Streaming SHA-256 hex digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_hash(path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a file's SHA-256 against an expected hex digest.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the digests differ.
pub fn verify_hash(path: &Path, expected_hex: &str) -> Result<()> {
    let actual = compute_hash(path)?;
    anyhow::ensure!(
        actual.eq_ignore_ascii_case(expected_hex),
        "checksum mismatch for {}: expected {expected_hex}, got {actual}",
        path.display()
    );
    Ok(())
}

// ── Manifest I/O ─────────────────────────────────────────────────────────────

/// Write the install `manifest.json`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_manifest(install_dir: &Path, manifest: &InstalledManifest) -> Result<()> {
    let path = install_dir.join("manifest.json");
    let text = serde_json::to_string_pretty(manifest).context("serializing manifest")?;
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))
}

/// Read an install directory's `manifest.json`, falling back to the legacy
/// `runtime.json`. `None` when neither exists.
///
/// # Errors
///
/// Returns an error only for unreadable or malformed files.
pub fn read_manifest(install_dir: &Path) -> Result<Option<InstalledManifest>> {
    let path = install_dir.join("manifest.json");
    if path.is_file() {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_str(&text)
            .map(Some)
            .with_context(|| format!("parsing {}", path.display()));
    }

    let legacy = install_dir.join("runtime.json");
    if legacy.is_file() {
        let text = std::fs::read_to_string(&legacy)
            .with_context(|| format!("reading {}", legacy.display()))?;
        let raw: serde_json::Value =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", legacy.display()))?;
        let name = raw["name"].as_str().unwrap_or_default().to_string();
        let mut manifest = InstalledManifest::new(
            &format!("runtime:{name}"),
            PackageKind::Runtime,
            &name,
            raw["version"].as_str().unwrap_or("0.0.0"),
            raw["installedAt"].as_str().unwrap_or_default(),
            InstallSource::Registry,
        );
        manifest.platform_arch = raw["platformArch"].as_str().map(ToString::to_string);
        return Ok(Some(manifest));
    }

    Ok(None)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Archive type from a URL when the descriptor does not declare one.
#[must_use]
pub fn infer_archive_type(url: &str) -> &'static str {
    if url.ends_with(".tar.xz") {
        "tar.xz"
    } else if url.ends_with(".zip") {
        "zip"
    } else {
        // .tar.gz, .tgz, and everything else.
        "tar.gz"
    }
}

/// Resolve a `/`-separated pattern under `root`, where `*` matches any
/// single path component. Children are visited in sorted order; the first
/// match wins.
#[must_use]
pub fn resolve_glob(root: &Path, pattern: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    walk_glob(root, &segments)
}

fn walk_glob(dir: &Path, segments: &[&str]) -> Option<PathBuf> {
    let Some((head, rest)) = segments.split_first() else {
        return dir.exists().then(|| dir.to_path_buf());
    };
    if *head == "*" {
        let mut children: Vec<PathBuf> = std::fs::read_dir(dir)
            .ok()?
            .flatten()
            .map(|e| e.path())
            .collect();
        children.sort();
        children.iter().find_map(|child| walk_glob(child, rest))
    } else {
        walk_glob(&dir.join(head), rest)
    }
}

fn final_component(pattern: &str) -> &str {
    pattern.rsplit('/').next().unwrap_or(pattern)
}

fn relocate(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Cross-device fallback.
    std::fs::copy(from, to)
        .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
    std::fs::remove_file(from).ok();
    Ok(())
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    Ok(())
}

fn file_name_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("download")
        .split('?')
        .next()
        .unwrap_or("download")
        .to_string()
}

fn short_version(version: &str) -> String {
    version
        .trim_start_matches('v')
        .split('.')
        .take(2)
        .collect::<Vec<_>>()
        .join(".")
}

fn runtime_release_base() -> String {
    std::env::var("AGORA_RUNTIME_RELEASE_URL")
        .unwrap_or_else(|_| RUNTIME_RELEASE_BASE.to_string())
}

fn contents_base() -> String {
    std::env::var("AGORA_REGISTRY_CONTENTS_URL")
        .unwrap_or_else(|_| DEFAULT_CONTENTS_URL.to_string())
}

/// Current instant as ISO-8601 UTC with second precision.
#[must_use]
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Debug, serde::Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    download_url: Option<String>,
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    // ── Archive type inference ───────────────────────────────────────────────

    #[test]
    fn test_infer_archive_type_by_extension() {
        assert_eq!(infer_archive_type("https://x/a.tar.gz"), "tar.gz");
        assert_eq!(infer_archive_type("https://x/a.tgz"), "tar.gz");
        assert_eq!(infer_archive_type("https://x/a.tar.xz"), "tar.xz");
        assert_eq!(infer_archive_type("https://x/a.zip"), "zip");
        assert_eq!(infer_archive_type("https://x/a.bin"), "tar.gz");
    }

    // ── Glob resolution ──────────────────────────────────────────────────────

    #[test]
    fn test_resolve_glob_star_matches_single_component() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("ripgrep-14.1.0-x86_64");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("rg"), b"#!").expect("write");

        let hit = resolve_glob(tmp.path(), "*/rg").expect("found");
        assert_eq!(hit, nested.join("rg"));
    }

    #[test]
    fn test_resolve_glob_first_match_wins_in_sorted_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        for dir in ["a-dir", "b-dir"] {
            let d = tmp.path().join(dir);
            std::fs::create_dir_all(&d).expect("mkdir");
            std::fs::write(d.join("tool"), b"x").expect("write");
        }
        let hit = resolve_glob(tmp.path(), "*/tool").expect("found");
        assert_eq!(hit, tmp.path().join("a-dir").join("tool"));
    }

    #[test]
    fn test_resolve_glob_concrete_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("bin")).expect("mkdir");
        std::fs::write(tmp.path().join("bin/ffmpeg"), b"x").expect("write");
        assert!(resolve_glob(tmp.path(), "bin/ffmpeg").is_some());
        assert!(resolve_glob(tmp.path(), "bin/missing").is_none());
    }

    // ── Hashing ──────────────────────────────────────────────────────────────

    #[test]
    fn test_compute_and_verify_hash() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("data");
        std::fs::write(&file, b"agora").expect("write");
        let digest = compute_hash(&file).expect("hashes");
        assert_eq!(digest.len(), 64);
        verify_hash(&file, &digest).expect("matches");
        verify_hash(&file, &digest.to_uppercase()).expect("case-insensitive");
        assert!(verify_hash(&file, &"0".repeat(64)).is_err());
    }

    // ── Tarball validation ───────────────────────────────────────────────────

    #[test]
    fn test_validate_tarball_rejects_traversal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let tar_path = tmp.path().join("evil.tar.gz");
        let file = std::fs::File::create(&tar_path).expect("create");
        let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(gz);
        let mut header = tar::Header::new_gnu();
        let name = header.as_gnu_mut().expect("gnu header").name.as_mut();
        name[..b"../escape".len()].copy_from_slice(b"../escape");
        header.set_size(2);
        header.set_cksum();
        builder.append(&header, &b"hi"[..]).expect("append");
        builder.into_inner().expect("finish").finish().expect("gz finish");

        assert!(validate_tarball_paths(&tar_path).is_err());
    }

    #[test]
    fn test_validate_tarball_accepts_safe_entries() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let tar_path = tmp.path().join("ok.tar.gz");
        let file = std::fs::File::create(&tar_path).expect("create");
        let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(gz);
        let mut header = tar::Header::new_gnu();
        header.set_size(2);
        header.set_cksum();
        builder
            .append_data(&mut header, "bin/rg", &b"hi"[..])
            .expect("append");
        builder.into_inner().expect("finish").finish().expect("gz finish");

        validate_tarball_paths(&tar_path).expect("safe");
    }

    // ── Manifest I/O ─────────────────────────────────────────────────────────

    #[test]
    fn test_manifest_write_read_round_trip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let manifest = InstalledManifest::new(
            "binary:ripgrep",
            PackageKind::Binary,
            "ripgrep",
            "14.1.0",
            "2025-06-01T00:00:00Z",
            InstallSource::Registry,
        );
        write_manifest(tmp.path(), &manifest).expect("writes");
        let back = read_manifest(tmp.path()).expect("reads").expect("present");
        assert_eq!(back.id, "binary:ripgrep");
        assert_eq!(back.installed_at, "2025-06-01T00:00:00Z");
    }

    #[test]
    fn test_read_manifest_legacy_runtime_json() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("runtime.json"),
            r#"{"name":"node","version":"20.11.1","platformArch":"linux-x64","installedAt":"2025-01-01T00:00:00Z"}"#,
        )
        .expect("write");
        let back = read_manifest(tmp.path()).expect("reads").expect("present");
        assert_eq!(back.id, "runtime:node");
        assert_eq!(back.kind, PackageKind::Runtime);
        assert_eq!(back.version, "20.11.1");
    }

    #[test]
    fn test_read_manifest_absent_is_none() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(read_manifest(tmp.path()).expect("ok").is_none());
    }

    #[test]
    fn test_short_version_truncates_to_major_minor() {
        assert_eq!(short_version("20.11.1"), "20.11");
        assert_eq!(short_version("v3.12.4"), "3.12");
        assert_eq!(short_version("20"), "20");
    }
}
