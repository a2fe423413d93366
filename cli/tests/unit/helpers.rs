//! Shared test helpers: temp-directory layouts and canned registry
//! indexes.

#![allow(dead_code)]

use agora_cli::infra::paths::AgoraPaths;
use agora_common::RegistryIndex;

/// A fresh layout under a temp directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn temp_paths() -> (tempfile::TempDir, AgoraPaths) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let paths = AgoraPaths::with_home(tmp.path().join(".agora"));
    paths.ensure_directories().expect("layout");
    (tmp, paths)
}

/// An index with a binary that depends on a runtime, both installable
/// offline through npm hints.
pub fn npm_backed_index() -> RegistryIndex {
    serde_json::from_value(serde_json::json!({
        "packages": {
            "binaries": {
                "official": [{
                    "id": "binary:demo-tool",
                    "name": "demo-tool",
                    "version": "2.0.0",
                    "npmPackage": "@demo/tool",
                    "binary": "demo-tool",
                    "requires": {"runtimes": ["node"]}
                }],
                "community": []
            },
            "runtimes": {
                "official": [{
                    "id": "runtime:node",
                    "name": "Node.js",
                    "version": "20.11.1",
                    "npmPackage": "node-runtime"
                }],
                "community": []
            }
        }
    }))
    .expect("valid index")
}

/// An index whose only package has no install strategy for any platform,
/// forcing the placeholder path.
pub fn undownloadable_index() -> RegistryIndex {
    serde_json::from_value(serde_json::json!({
        "packages": {
            "binaries": {
                "official": [{
                    "id": "binary:ghost",
                    "name": "ghost",
                    "version": "1.0.0"
                }],
                "community": []
            }
        }
    }))
    .expect("valid index")
}
