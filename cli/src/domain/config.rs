//! The central config document (`~/.agora/agora.json`).
//!
//! Pure types only — reading, locking, and atomic writes live in
//! `infra::config_store`. The document must agree with every install's
//! `manifest.json` on `id`, `version`, and `installedAt`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use agora_common::SecretRequirement;

use crate::domain::launch::LaunchConfig;

/// Current document schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 2;

// ── Document ─────────────────────────────────────────────────────────────────

/// Top-level document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgoraConfig {
    /// CLI version that last wrote the document.
    pub version: String,
    pub schema_version: u32,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub runtimes: BTreeMap<String, RuntimeEntry>,
    pub stacks: BTreeMap<String, StackConfig>,
    pub binaries: BTreeMap<String, BinaryEntry>,
    pub secrets: BTreeMap<String, SecretMeta>,
}

impl Default for AgoraConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            schema_version: CONFIG_SCHEMA_VERSION,
            installed: false,
            installed_at: None,
            updated_at: None,
            runtimes: BTreeMap::new(),
            stacks: BTreeMap::new(),
            binaries: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }
}

/// An installed runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeEntry {
    /// Install directory.
    pub path: String,
    /// Absolute path of the interpreter binary.
    pub bin: String,
    pub version: String,
}

/// An installed standalone binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinaryEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<String>,
}

impl Default for BinaryEntry {
    fn default() -> Self {
        Self { path: String::new(), version: None, binaries: Vec::new() }
    }
}

/// An installed stack with its normalised launch record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackConfig {
    pub name: String,
    pub version: String,
    /// Install directory.
    pub path: String,
    pub launch: LaunchConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretRequirement>,
    /// Tool inventory filled in by the tool indexer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<CachedTool>>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: String::new(),
            path: String::new(),
            launch: LaunchConfig::default(),
            secrets: Vec::new(),
            tools: None,
        }
    }
}

/// Metadata about one declared secret. The value itself lives in the
/// secret-store backend named by `provider`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretMeta {
    pub configured: bool,
    pub provider: String,
    /// Stack that registered the secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for SecretMeta {
    fn default() -> Self {
        Self {
            configured: false,
            provider: default_secret_provider().to_string(),
            stack: None,
            required: false,
            last_updated: None,
        }
    }
}

/// Platform default for where secret values are kept.
#[must_use]
pub fn default_secret_provider() -> &'static str {
    if cfg!(target_os = "macos") {
        "keychain"
    } else {
        "secrets.json"
    }
}

// ── Cached tools ─────────────────────────────────────────────────────────────

/// One tool as reported by a stack's `tools/list`, normalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTool {
    pub name: String,
    /// Falls back to `name` when the stack reports none.
    pub description: String,
    /// Falls back to `{"type":"object","properties":{}}`.
    pub input_schema: JsonValue,
}

// ── Unit tests ───────────────────────────────────────────────────────────────
