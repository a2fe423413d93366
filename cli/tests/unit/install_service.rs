//! Installer service tests over mocked ports: dependency ordering,
//! idempotency, placeholder fallback, and uninstall post-conditions.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use agora_cli::application::services::install::{
    install_package, list_installed, uninstall_package, InstallCtx, InstallOptions,
};
use agora_cli::infra::config_store::ConfigStore;
use agora_cli::infra::lockfile::read_lockfile;
use agora_cli::infra::registry::RegistryClient;
use agora_common::{InstallSource, PackageKind};

use crate::helpers::{npm_backed_index, temp_paths, undownloadable_index};
use crate::mocks::{FailingRunner, RecordingRunner, SilentReporter};

/// Dependencies install strictly before their dependents, and the root
/// lockfile records them (S1 shape).
#[tokio::test]
async fn test_install_with_dependency_orders_and_locks() {
    let (_tmp, paths) = temp_paths();
    let config = ConfigStore::new(&paths);
    let client = RegistryClient::with_index(&paths, npm_backed_index());
    let runner = RecordingRunner::default();
    let ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: &SilentReporter,
    };

    let outcome = install_package(&ctx, "binary:demo-tool", InstallOptions::default())
        .await
        .expect("installs");
    assert!(!outcome.already_installed);
    assert_eq!(outcome.installed, vec!["runtime:node", "binary:demo-tool"]);

    assert!(paths.is_installed(PackageKind::Runtime, "node"));
    assert!(paths.is_installed(PackageKind::Binary, "demo-tool"));

    let lockfile = read_lockfile(&paths, PackageKind::Binary, "demo-tool")
        .expect("reads")
        .expect("present");
    assert_eq!(lockfile.version, "2.0.0");
    assert_eq!(lockfile.dependencies.len(), 1);
    assert_eq!(lockfile.dependencies[0].id, "runtime:node");

    // Both installs went through npm.
    let calls = runner.calls();
    assert_eq!(calls.iter().filter(|c| c.contains("install")).count(), 2);
}

/// A second install is a no-op; `force` reinstalls the root only.
#[tokio::test]
async fn test_reinstall_is_idempotent_unless_forced() {
    let (_tmp, paths) = temp_paths();
    let config = ConfigStore::new(&paths);
    let client = RegistryClient::with_index(&paths, npm_backed_index());
    let runner = RecordingRunner::default();
    let ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: &SilentReporter,
    };

    install_package(&ctx, "binary:demo-tool", InstallOptions::default())
        .await
        .expect("first install");

    let second = install_package(&ctx, "binary:demo-tool", InstallOptions::default())
        .await
        .expect("second install");
    assert!(second.already_installed);
    assert!(second.installed.is_empty());

    let forced = install_package(&ctx, "binary:demo-tool", InstallOptions { force: true })
        .await
        .expect("forced install");
    assert_eq!(forced.installed, vec!["binary:demo-tool"]);
}

/// Download failure for a binary leaves a placeholder manifest recording
/// the error instead of failing the batch.
#[tokio::test]
async fn test_unavailable_download_records_placeholder() {
    let (_tmp, paths) = temp_paths();
    let config = ConfigStore::new(&paths);
    let client = RegistryClient::with_index(&paths, undownloadable_index());
    let runner = FailingRunner;
    let ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: &SilentReporter,
    };

    install_package(&ctx, "binary:ghost", InstallOptions::default())
        .await
        .expect("install records placeholder");

    let installed = list_installed(&paths).expect("lists");
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].source, InstallSource::Placeholder);
    assert!(installed[0].error.as_deref().expect("error").contains("no download"));

    // The broken install stays visible and a retry is still possible.
    assert!(paths.is_installed(PackageKind::Binary, "ghost"));
}

/// Uninstall removes the directory, the lockfile, and the config entry
/// (invariant 4).
#[tokio::test]
async fn test_uninstall_clears_all_state() {
    let (_tmp, paths) = temp_paths();
    let config = ConfigStore::new(&paths);
    let client = RegistryClient::with_index(&paths, npm_backed_index());
    let runner = RecordingRunner::default();
    let ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: &SilentReporter,
    };

    install_package(&ctx, "binary:demo-tool", InstallOptions::default())
        .await
        .expect("installs");
    assert!(config.read().expect("read").binaries.contains_key("demo-tool"));

    uninstall_package(&paths, &config, "binary:demo-tool").expect("uninstalls");

    assert!(!paths.is_installed(PackageKind::Binary, "demo-tool"));
    assert!(read_lockfile(&paths, PackageKind::Binary, "demo-tool")
        .expect("reads")
        .is_none());
    assert!(!config.read().expect("read").binaries.contains_key("demo-tool"));
}

/// Unknown packages fail with a named error and install nothing.
#[tokio::test]
async fn test_unknown_package_not_found() {
    let (_tmp, paths) = temp_paths();
    let config = ConfigStore::new(&paths);
    let client = RegistryClient::with_index(&paths, npm_backed_index());
    let runner = RecordingRunner::default();
    let ctx = InstallCtx {
        paths: &paths,
        source: &client,
        runner: &runner,
        config: &config,
        reporter: &SilentReporter,
    };

    let err = install_package(&ctx, "binary:nope", InstallOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("binary:nope"));
    assert!(list_installed(&paths).expect("lists").is_empty());
}
