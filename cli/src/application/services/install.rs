//! Application service — package resolution and installation use-cases.
//!
//! Imports only from `crate::domain`, `agora_common`, and the application
//! ports; filesystem and subprocess work is routed through the injected
//! context. Install order is strict post-order over the resolved tree; a
//! failed package aborts the batch and earlier successes stay in place.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use agora_common::package::strip_kind_prefix;
use agora_common::{
    InstallSource, InstalledManifest, PackageDescriptor, PackageId, PackageKind, StackManifest,
};

use crate::application::ports::{
    CommandRunner, FoundPackage, InstallEvent, InstallPhase, PackageSource, ProgressReporter,
};
use crate::domain::config::{BinaryEntry, RuntimeEntry};
use crate::domain::error::InstallError;
use crate::domain::launch::bundled_runtime_bin;
use crate::domain::resolver::{install_order, ResolvedNode};
use crate::infra::config_store::{ConfigStore, StackInfo};
use crate::infra::download::{now_iso, read_manifest, write_manifest, Downloader};
use crate::infra::lockfile::{remove_lockfile, write_lockfile, Lockfile};
use crate::infra::paths::AgoraPaths;

/// Everything the installer needs, passed explicitly — no globals.
pub struct InstallCtx<'a, S: PackageSource, R: CommandRunner, P: ProgressReporter> {
    pub paths: &'a AgoraPaths,
    pub source: &'a S,
    pub runner: &'a R,
    pub config: &'a ConfigStore,
    pub reporter: &'a P,
}

/// Install options.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Reinstall the root package even when already installed.
    pub force: bool,
}

/// Result of one install invocation.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    pub id: String,
    /// Package ids installed, in order.
    pub installed: Vec<String>,
    pub already_installed: bool,
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Expand a requested package into its dependency tree. Short ids
/// normalise to `stack:<name>`; children come from `requires` and are
/// leaves by registry contract.
///
/// # Errors
///
/// Returns `InstallError::PackageNotFound` for the root or any dependency
/// absent from the registry.
pub fn resolve_tree(
    source: &impl PackageSource,
    paths: &AgoraPaths,
    id: &str,
) -> Result<ResolvedNode> {
    let root_id = PackageId::parse(id)?;
    let found = source
        .get_package(&root_id.to_string())?
        .ok_or_else(|| InstallError::PackageNotFound(root_id.to_string()))?;

    let mut dependencies = Vec::new();
    if let Some(requires) = &found.descriptor.requires {
        for (kind, reference) in requires.entries() {
            let name = strip_kind_prefix(&reference).to_string();
            let dep_id = format!("{kind}:{name}");
            let dep = source
                .get_package(&dep_id)?
                .ok_or_else(|| InstallError::PackageNotFound(dep_id.clone()))?;
            dependencies.push(node_from(&dep, paths, Vec::new()));
        }
    }

    Ok(node_from(&found, paths, dependencies))
}

fn node_from(
    found: &FoundPackage,
    paths: &AgoraPaths,
    dependencies: Vec<ResolvedNode>,
) -> ResolvedNode {
    let name = strip_kind_prefix(&found.descriptor.id).to_string();
    ResolvedNode {
        id: format!("{}:{name}", found.kind),
        kind: found.kind,
        name: name.clone(),
        version: found.descriptor.version.clone(),
        installed: paths.is_installed(found.kind, &name),
        dependencies,
    }
}

// ── Install ──────────────────────────────────────────────────────────────────

/// Install a package and its dependencies in topological order.
///
/// # Errors
///
/// Aborts the batch on the first failing package and returns its error;
/// earlier successful installs are left in place (no rollback).
pub async fn install_package<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    id: &str,
    options: InstallOptions,
) -> Result<InstallOutcome> {
    ctx.paths.ensure_directories()?;

    ctx.reporter.event(&InstallEvent {
        phase: InstallPhase::Resolving,
        package: id.to_string(),
        current: None,
        total: None,
        message: None,
    });
    let root = resolve_tree(ctx.source, ctx.paths, id)?;

    let mut order: Vec<ResolvedNode> = install_order(&root).into_iter().cloned().collect();
    if order.is_empty() && root.installed && !options.force {
        return Ok(InstallOutcome {
            id: root.id,
            installed: Vec::new(),
            already_installed: true,
        });
    }
    if options.force && !order.iter().any(|n| n.id == root.id) {
        order.push(root.clone());
    }

    let total = order.len();
    let mut installed = Vec::with_capacity(total);
    for (index, node) in order.iter().enumerate() {
        ctx.reporter.event(&InstallEvent {
            phase: InstallPhase::Installing,
            package: node.id.clone(),
            current: Some(index + 1),
            total: Some(total),
            message: None,
        });
        if let Err(e) = install_one(ctx, node).await {
            // A dependency that cannot be installed is a distinct failure
            // from the root package failing.
            if node.id != root.id {
                return Err(e.context(InstallError::DependencyUnsatisfied {
                    missing: vec![node.id.clone()],
                }));
            }
            return Err(e.context(format!("installing {}", node.id)));
        }

        ctx.reporter.event(&InstallEvent {
            phase: InstallPhase::Lockfile,
            package: node.id.clone(),
            current: Some(index + 1),
            total: Some(total),
            message: None,
        });
        let dependencies: Vec<(String, String)> = if node.id == root.id {
            root.dependencies
                .iter()
                .map(|d| (d.id.clone(), d.version.clone().unwrap_or_else(|| "0.0.0".into())))
                .collect()
        } else {
            Vec::new()
        };
        let lockfile = Lockfile::new(
            &node.id,
            &node.name,
            node.version.as_deref().unwrap_or("0.0.0"),
            &now_iso(),
            &dependencies,
        );
        write_lockfile(ctx.paths, node.kind, &node.name, &lockfile)?;

        ctx.reporter.event(&InstallEvent {
            phase: InstallPhase::Installed,
            package: node.id.clone(),
            current: Some(index + 1),
            total: Some(total),
            message: None,
        });
        ctx.reporter.success(&format!("installed {}", node.id));
        installed.push(node.id.clone());
    }

    Ok(InstallOutcome { id: root.id, installed, already_installed: false })
}

async fn install_one<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    node: &ResolvedNode,
) -> Result<()> {
    let found = ctx
        .source
        .get_package(&node.id)?
        .ok_or_else(|| InstallError::PackageNotFound(node.id.clone()))?;
    let descriptor = &found.descriptor;

    match node.kind {
        PackageKind::Runtime | PackageKind::Binary => {
            install_artifact(ctx, node, descriptor).await?;
        }
        PackageKind::Agent => {
            install_agent(ctx, node, descriptor).await?;
        }
        PackageKind::Stack | PackageKind::Prompt => {
            install_source(ctx, node, descriptor).await?;
        }
    }
    Ok(())
}

/// Runtimes and binaries: npm/pip hints first, then tarball download, then
/// a placeholder manifest recording the failure (keeps retries idempotent).
async fn install_artifact<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    node: &ResolvedNode,
    descriptor: &PackageDescriptor,
) -> Result<()> {
    let install_dir = ctx.paths.install_dir(node.kind, &node.name);

    let hint_result = if let Some(package) = &descriptor.npm_package {
        Some(npm_install_prefixed(ctx, &install_dir, package).await)
    } else if let Some(package) = &descriptor.pip_package {
        Some(pip_install_target(ctx, &install_dir, package).await)
    } else {
        None
    };

    match hint_result {
        Some(Ok(source)) => {
            let mut manifest = base_manifest(node, source);
            manifest.binaries = descriptor.exported_binaries();
            write_manifest(&install_dir, &manifest)?;
        }
        Some(Err(_)) | None => {
            let downloader = Downloader::new(ctx.paths, ctx.runner);
            match downloader
                .download_package(descriptor, node.kind, &node.name, ctx.reporter)
                .await
            {
                Ok(_) => {}
                Err(e) => {
                    // Placeholder keeps the registry state consistent; the
                    // broken install is visible in list output.
                    ctx.reporter.warn(&format!(
                        "download failed for {}, recording placeholder: {e}",
                        node.id
                    ));
                    std::fs::create_dir_all(&install_dir)
                        .with_context(|| format!("creating {}", install_dir.display()))?;
                    let mut manifest = base_manifest(node, InstallSource::Placeholder);
                    manifest.error = Some(e.to_string());
                    write_manifest(&install_dir, &manifest)?;
                }
            }
        }
    }

    record_in_config(ctx, node, &install_dir)?;
    Ok(())
}

/// Agent CLIs: npm into a local package prefix, or pip into an isolated
/// virtual environment under `<install>/venv`.
async fn install_agent<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    node: &ResolvedNode,
    descriptor: &PackageDescriptor,
) -> Result<()> {
    let install_dir = ctx.paths.install_dir(node.kind, &node.name);
    std::fs::create_dir_all(&install_dir)
        .with_context(|| format!("creating {}", install_dir.display()))?;

    let source = if let Some(package) = &descriptor.npm_package {
        let npm = npm_path(ctx.paths);
        run_ok(ctx.runner.run_in(&install_dir, &npm, &["init", "-y"]).await, "npm init")?;
        run_ok(
            ctx.runner.run_in(&install_dir, &npm, &["install", package]).await,
            "npm install",
        )?;
        InstallSource::Npm
    } else if let Some(package) = &descriptor.pip_package {
        let python = python_path(ctx.paths);
        let venv = install_dir.join("venv");
        run_ok(
            ctx.runner
                .run(&python, &["-m", "venv", &venv.to_string_lossy()])
                .await,
            "python -m venv",
        )?;
        let pip = venv_pip(&venv);
        run_ok(
            ctx.runner.run(&pip.to_string_lossy(), &["install", package]).await,
            "pip install",
        )?;
        InstallSource::Pip
    } else {
        anyhow::bail!("agent '{}' has neither npmPackage nor pipPackage", node.id);
    };

    let mut manifest = base_manifest(node, source);
    manifest.binaries = descriptor.exported_binaries();
    write_manifest(&install_dir, &manifest)?;
    Ok(())
}

/// Stacks and prompts: source download, install metadata merged into the
/// downloaded `manifest.json` (the stack's own fields stay intact), then
/// central-config registration for stacks.
async fn install_source<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    node: &ResolvedNode,
    descriptor: &PackageDescriptor,
) -> Result<()> {
    let downloader = Downloader::new(ctx.paths, ctx.runner);
    let dest = downloader.download_source(descriptor, node.kind, &node.name).await?;

    // Single-file prompts carry no directory to put a manifest in.
    if node.kind == PackageKind::Prompt && dest.extension().is_some_and(|e| e == "md") {
        return Ok(());
    }

    stamp_install_metadata(&dest, node)?;

    if node.kind == PackageKind::Stack {
        register_stack(ctx, &node.id, &dest)?;
    }
    Ok(())
}

/// Overlay the install record fields onto the downloaded manifest so one
/// file serves as both the package manifest and the install marker.
fn stamp_install_metadata(install_dir: &Path, node: &ResolvedNode) -> Result<()> {
    let path = install_dir.join("manifest.json");
    let mut doc: serde_json::Value = if path.is_file() {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_json::json!({})
    };

    let object = doc
        .as_object_mut()
        .with_context(|| format!("{} is not a JSON object", path.display()))?;
    object.insert("id".into(), serde_json::json!(node.id));
    object.insert("kind".into(), serde_json::json!(node.kind));
    if !object.contains_key("name") {
        object.insert("name".into(), serde_json::json!(node.name));
    }
    if !object.contains_key("version") {
        object.insert(
            "version".into(),
            serde_json::json!(node.version.as_deref().unwrap_or("0.0.0")),
        );
    }
    object.insert("installedAt".into(), serde_json::json!(now_iso()));
    object.insert("source".into(), serde_json::json!("registry"));

    let text = serde_json::to_string_pretty(&doc).context("serializing manifest")?;
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))
}

/// Read the downloaded stack manifest and record the stack (launch record,
/// secrets) in the central config.
fn register_stack<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    id: &str,
    install_dir: &Path,
) -> Result<()> {
    let manifest_path = install_dir.join("manifest.json");
    let text = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    let stack = StackManifest::parse(&manifest_path.to_string_lossy(), &text)?;

    ctx.config.add_stack(
        id,
        &StackInfo {
            name: stack.name.clone(),
            version: stack.version.clone(),
            path: install_dir.to_path_buf(),
            command: stack.command.clone(),
            runtime: stack.requires.runtimes.first().cloned(),
            secrets: stack.requires.secrets.clone(),
        },
    )
}

fn record_in_config<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    node: &ResolvedNode,
    install_dir: &Path,
) -> Result<()> {
    let version = node.version.clone().unwrap_or_else(|| "0.0.0".into());
    match node.kind {
        PackageKind::Runtime => {
            let bin_name =
                if node.name.starts_with("python") { "python3" } else { node.name.as_str() };
            ctx.config.add_runtime(
                &node.name,
                RuntimeEntry {
                    path: install_dir.to_string_lossy().to_string(),
                    bin: bundled_runtime_bin(&ctx.paths.runtimes(), &node.name, bin_name)
                        .to_string_lossy()
                        .to_string(),
                    version,
                },
            )
        }
        PackageKind::Binary => {
            let name = node.name.clone();
            let entry = BinaryEntry {
                path: install_dir.to_string_lossy().to_string(),
                version: Some(version),
                binaries: read_manifest(install_dir)?
                    .map(|m| m.binaries)
                    .unwrap_or_default(),
            };
            ctx.config.update(move |cfg| {
                cfg.binaries.insert(name, entry);
            })?;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn base_manifest(node: &ResolvedNode, source: InstallSource) -> InstalledManifest {
    InstalledManifest::new(
        &node.id,
        node.kind,
        &node.name,
        node.version.as_deref().unwrap_or("0.0.0"),
        &now_iso(),
        source,
    )
}

// ── Local install ────────────────────────────────────────────────────────────

/// Install a stack from a local directory: read its manifest, replace any
/// existing install, copy recursively (skipping `node_modules` and
/// `.git`), and register it.
///
/// # Errors
///
/// Returns an error if no manifest is found, the manifest is invalid, or
/// the copy fails.
pub fn install_from_local(
    paths: &AgoraPaths,
    config: &ConfigStore,
    dir: &Path,
) -> Result<String> {
    paths.ensure_directories()?;

    let manifest_file = ["stack.yaml", "manifest.yaml", "manifest.json"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .with_context(|| format!("no stack manifest found in {}", dir.display()))?;
    let text = std::fs::read_to_string(&manifest_file)
        .with_context(|| format!("reading {}", manifest_file.display()))?;
    let stack = StackManifest::parse(&manifest_file.to_string_lossy(), &text)?;
    let name = strip_kind_prefix(&stack.id).to_string();

    let install_dir = paths.install_dir(PackageKind::Stack, &name);
    if install_dir.exists() {
        std::fs::remove_dir_all(&install_dir)
            .with_context(|| format!("replacing {}", install_dir.display()))?;
    }
    copy_tree(dir, &install_dir)?;

    // One file serves as both package manifest and install marker; merge
    // the metadata over whatever the stack shipped.
    let manifest_path = install_dir.join("manifest.json");
    let mut doc: serde_json::Value = if manifest_path.is_file() {
        let text = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("reading {}", manifest_path.display()))?;
        serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::to_value(&stack).context("serializing stack manifest")?
    };
    if let Some(object) = doc.as_object_mut() {
        object.insert("id".into(), serde_json::json!(stack.id));
        object.insert("kind".into(), serde_json::json!("stack"));
        object.insert("name".into(), serde_json::json!(name));
        object.insert("version".into(), serde_json::json!(stack.version));
        object.insert("installedAt".into(), serde_json::json!(now_iso()));
        object.insert("source".into(), serde_json::json!("local"));
        object.insert("sourcePath".into(), serde_json::json!(dir.to_string_lossy()));
    }
    std::fs::write(
        &manifest_path,
        serde_json::to_string_pretty(&doc).context("serializing manifest")?,
    )
    .with_context(|| format!("writing {}", manifest_path.display()))?;

    config.add_stack(
        &stack.id,
        &StackInfo {
            name: stack.name.clone(),
            version: stack.version.clone(),
            path: install_dir,
            command: stack.command.clone(),
            runtime: stack.requires.runtimes.first().cloned(),
            secrets: stack.requires.secrets.clone(),
        },
    )?;
    Ok(stack.id)
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).with_context(|| format!("creating {}", to.display()))?;
    for entry in std::fs::read_dir(from).with_context(|| format!("reading {}", from.display()))? {
        let entry = entry.context("reading dir entry")?;
        let name = entry.file_name();
        if name == "node_modules" || name == ".git" {
            continue;
        }
        let src = entry.path();
        let dst = to.join(&name);
        if src.is_dir() {
            copy_tree(&src, &dst)?;
        } else {
            std::fs::copy(&src, &dst)
                .with_context(|| format!("copying {}", src.display()))?;
        }
    }
    Ok(())
}

// ── Uninstall / list / update ────────────────────────────────────────────────

/// Remove a package's install directory, its lockfile, and its central
/// config entry.
///
/// # Errors
///
/// Returns an error on filesystem or config failures.
pub fn uninstall_package(paths: &AgoraPaths, config: &ConfigStore, id: &str) -> Result<()> {
    let package = PackageId::parse(id)?;
    let install_dir = paths.install_dir(package.kind, &package.name);
    if install_dir.exists() {
        std::fs::remove_dir_all(&install_dir)
            .with_context(|| format!("removing {}", install_dir.display()))?;
    }
    if package.kind == PackageKind::Prompt {
        let file = paths.prompt_file(&package.name);
        if file.exists() {
            std::fs::remove_file(&file)
                .with_context(|| format!("removing {}", file.display()))?;
        }
    }
    remove_lockfile(paths, package.kind, &package.name)?;

    match package.kind {
        PackageKind::Stack => config.remove_stack(&package.to_string())?,
        PackageKind::Runtime => {
            let name = package.name.clone();
            config.update(move |cfg| {
                cfg.runtimes.remove(&name);
            })?;
        }
        PackageKind::Binary => {
            let name = package.name.clone();
            config.update(move |cfg| {
                cfg.binaries.remove(&name);
            })?;
        }
        _ => {}
    }
    Ok(())
}

/// Every installed package, by scanning the kind directories for install
/// manifests. Dot-directories are skipped.
///
/// # Errors
///
/// Returns an error only for unreadable manifests.
pub fn list_installed(paths: &AgoraPaths) -> Result<Vec<InstalledManifest>> {
    let mut out = Vec::new();
    for kind in PackageKind::ALL {
        let dir = paths.kind_dir(kind);
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        let mut paths_in_dir: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths_in_dir.sort();

        for path in paths_in_dir {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                if let Some(manifest) = read_manifest(&path)? {
                    out.push(manifest);
                }
            } else if kind == PackageKind::Prompt && name.ends_with(".md") {
                let prompt_name = name.trim_end_matches(".md").to_string();
                out.push(InstalledManifest::new(
                    &format!("prompt:{prompt_name}"),
                    PackageKind::Prompt,
                    &prompt_name,
                    "0.0.0",
                    "",
                    InstallSource::Registry,
                ));
            }
        }
    }
    Ok(out)
}

/// Update = reinstall with `force`.
///
/// # Errors
///
/// See `install_package`.
pub async fn update_package<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    id: &str,
) -> Result<InstallOutcome> {
    install_package(ctx, id, InstallOptions { force: true }).await
}

/// Update every installed package, reporting per-package success or
/// failure without aborting the batch.
pub async fn update_all<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
) -> Vec<(String, Result<InstallOutcome>)> {
    let installed = match list_installed(ctx.paths) {
        Ok(list) => list,
        Err(e) => return vec![("<scan>".to_string(), Err(e))],
    };
    let mut results = Vec::with_capacity(installed.len());
    for manifest in installed {
        let result = update_package(ctx, &manifest.id).await;
        if let Err(e) = &result {
            ctx.reporter.warn(&format!("update failed for {}: {e}", manifest.id));
        }
        results.push((manifest.id, result));
    }
    results
}

// ── npm / pip plumbing ───────────────────────────────────────────────────────

/// Bundled npm when `RESOURCES_PATH` points at one, else system `npm`.
fn npm_path(paths: &AgoraPaths) -> String {
    if let Ok(resources) = std::env::var("RESOURCES_PATH") {
        let bundled = Path::new(&resources).join("bundled-runtimes/node/bin/npm");
        if bundled.is_file() {
            return bundled.to_string_lossy().to_string();
        }
    }
    let local = bundled_runtime_bin(&paths.runtimes(), "node", "npm");
    if local.is_file() {
        return local.to_string_lossy().to_string();
    }
    "npm".to_string()
}

/// Bundled python when installed, else system `python3`.
fn python_path(paths: &AgoraPaths) -> String {
    let bundled = bundled_runtime_bin(&paths.runtimes(), "python", "python3");
    if bundled.is_file() {
        bundled.to_string_lossy().to_string()
    } else {
        "python3".to_string()
    }
}

fn venv_pip(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("pip.exe")
    } else {
        venv.join("bin").join("pip")
    }
}

async fn npm_install_prefixed<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    install_dir: &Path,
    package: &str,
) -> Result<InstallSource> {
    std::fs::create_dir_all(install_dir)
        .with_context(|| format!("creating {}", install_dir.display()))?;
    let npm = npm_path(ctx.paths);
    run_ok(
        ctx.runner
            .run(&npm, &["install", "--prefix", &install_dir.to_string_lossy(), package])
            .await,
        "npm install",
    )?;
    Ok(InstallSource::Npm)
}

async fn pip_install_target<S: PackageSource, R: CommandRunner, P: ProgressReporter>(
    ctx: &InstallCtx<'_, S, R, P>,
    install_dir: &Path,
    package: &str,
) -> Result<InstallSource> {
    std::fs::create_dir_all(install_dir)
        .with_context(|| format!("creating {}", install_dir.display()))?;
    let python = python_path(ctx.paths);
    run_ok(
        ctx.runner
            .run(
                &python,
                &["-m", "pip", "install", "--target", &install_dir.to_string_lossy(), package],
            )
            .await,
        "pip install",
    )?;
    Ok(InstallSource::Pip)
}

fn run_ok(result: Result<std::process::Output>, what: &str) -> Result<()> {
    let output = result?;
    anyhow::ensure!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr).trim()
    );
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
