//! Infrastructure implementation of the central config store.
//!
//! A single JSON document at `~/.agora/agora.json`, mode 0600. Writes are
//! read-modify-write under the advisory file lock and land atomically via
//! temp file + rename; reads are lock-free and may observe either the pre-
//! or post-rename file.

use anyhow::{Context, Result};

use agora_common::SecretRequirement;

use crate::domain::config::{
    default_secret_provider, AgoraConfig, CachedTool, RuntimeEntry, SecretMeta, StackConfig,
};
use crate::domain::launch::create_launch_config;
use crate::infra::download::now_iso;
use crate::infra::file_lock::FileLock;
use crate::infra::paths::AgoraPaths;

/// Everything `add_stack` needs to derive a `StackConfig`.
#[derive(Debug, Clone)]
pub struct StackInfo {
    pub name: String,
    pub version: String,
    /// Install directory.
    pub path: std::path::PathBuf,
    /// Launch command from the manifest; may be empty.
    pub command: Vec<String>,
    /// Runtime tag (`node`, `python`) for bundled-interpreter resolution.
    pub runtime: Option<String>,
    pub secrets: Vec<SecretRequirement>,
}

/// Handle on the central config document.
pub struct ConfigStore {
    paths: AgoraPaths,
}

impl ConfigStore {
    #[must_use]
    pub fn new(paths: &AgoraPaths) -> Self {
        Self { paths: paths.clone() }
    }

    /// Read the existing document or create a fresh one with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or the initial write fails.
    pub fn init(&self) -> Result<AgoraConfig> {
        if self.paths.config_file().is_file() {
            return self.read();
        }
        self.update(|cfg| {
            cfg.installed = true;
            cfg.installed_at = Some(now_iso());
        })
    }

    /// Lock-free read. A missing file yields the default document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read(&self) -> Result<AgoraConfig> {
        let path = self.paths.config_file();
        if !path.is_file() {
            return Ok(AgoraConfig::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Read-modify-write under the advisory lock, with `updatedAt` and the
    /// writer version refreshed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigStoreError::LockContention` when the lock cannot be
    /// acquired within the timeout, or an I/O error from the write.
    pub fn update(&self, modifier: impl FnOnce(&mut AgoraConfig)) -> Result<AgoraConfig> {
        let _lock = FileLock::acquire(&self.paths.config_lock_file())?;
        let mut config = self.read()?;
        modifier(&mut config);
        config.version = env!("CARGO_PKG_VERSION").to_string();
        config.updated_at = Some(now_iso());
        self.write_atomic(&config)?;
        Ok(config)
    }

    // ── Stack operations ─────────────────────────────────────────────────────

    /// Record an installed stack: derive its launch record and register any
    /// secrets it requires that are not yet known (as unconfigured, with
    /// the platform-default provider).
    ///
    /// # Errors
    ///
    /// See `update`.
    pub fn add_stack(&self, id: &str, info: &StackInfo) -> Result<()> {
        let launch = create_launch_config(
            &info.command,
            info.runtime.as_deref(),
            &info.path,
            &self.paths.runtimes(),
        );
        let stack = StackConfig {
            name: info.name.clone(),
            version: info.version.clone(),
            path: info.path.to_string_lossy().to_string(),
            launch,
            secrets: info.secrets.clone(),
            tools: None,
        };

        let id = id.to_string();
        let secrets = info.secrets.clone();
        self.update(move |cfg| {
            cfg.stacks.insert(id.clone(), stack);
            for secret in &secrets {
                cfg.secrets.entry(secret.name.clone()).or_insert_with(|| SecretMeta {
                    configured: false,
                    provider: default_secret_provider().to_string(),
                    stack: Some(id.clone()),
                    required: secret.required,
                    last_updated: None,
                });
            }
        })?;
        Ok(())
    }

    /// Remove a stack and any secret it owned that no remaining stack still
    /// requires.
    ///
    /// # Errors
    ///
    /// See `update`.
    pub fn remove_stack(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.update(move |cfg| {
            cfg.stacks.remove(&id);
            let still_required: Vec<String> = cfg
                .stacks
                .values()
                .flat_map(|s| s.secrets.iter())
                .filter(|s| s.required)
                .map(|s| s.name.clone())
                .collect();
            cfg.secrets.retain(|name, meta| {
                meta.stack.as_deref() != Some(id.as_str()) || still_required.contains(name)
            });
        })?;
        Ok(())
    }

    /// Replace a stack's cached tool inventory.
    ///
    /// # Errors
    ///
    /// See `update`.
    pub fn update_stack_tools(&self, id: &str, tools: Vec<CachedTool>) -> Result<()> {
        let id = id.to_string();
        self.update(move |cfg| {
            if let Some(stack) = cfg.stacks.get_mut(&id) {
                stack.tools = Some(tools);
            }
        })?;
        Ok(())
    }

    // ── Runtime and secret operations ────────────────────────────────────────

    /// Record an installed runtime.
    ///
    /// # Errors
    ///
    /// See `update`.
    pub fn add_runtime(&self, name: &str, entry: RuntimeEntry) -> Result<()> {
        let name = name.to_string();
        self.update(move |cfg| {
            cfg.runtimes.insert(name, entry);
        })?;
        Ok(())
    }

    /// Flip a secret's configured flag, stamping `lastUpdated`.
    ///
    /// # Errors
    ///
    /// See `update`.
    pub fn update_secret_status(&self, name: &str, configured: bool) -> Result<()> {
        let name = name.to_string();
        self.update(move |cfg| {
            let meta = cfg.secrets.entry(name).or_default();
            meta.configured = configured;
            meta.last_updated = Some(now_iso());
        })?;
        Ok(())
    }

    // ── Atomic write ─────────────────────────────────────────────────────────

    fn write_atomic(&self, config: &AgoraConfig) -> Result<()> {
        let path = self.paths.config_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(config).context("serializing config")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing {}", temp_path.display()))?;
        restrict_mode(&temp_path)?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("finalizing {}", path.display()))?;
        // Reassert after rename; umask quirks must not loosen the file.
        restrict_mode(&path)?;
        Ok(())
    }
}

fn restrict_mode(path: &std::path::Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = AgoraPaths::with_home(tmp.path().join(".agora"));
        paths.ensure_directories().expect("layout");
        (tmp, ConfigStore::new(&paths))
    }

    fn demo_info() -> StackInfo {
        StackInfo {
            name: "Demo".to_string(),
            version: "1.0.0".to_string(),
            path: PathBuf::from("/home/u/.agora/stacks/demo"),
            command: vec!["node".to_string(), "dist/index.js".to_string()],
            runtime: Some("node".to_string()),
            secrets: vec![SecretRequirement { name: "API_KEY".into(), required: true }],
        }
    }

    // ── init / update ────────────────────────────────────────────────────────

    #[test]
    fn test_init_creates_document_and_is_idempotent() {
        let (_tmp, store) = store();
        let first = store.init().expect("init");
        assert!(first.installed);
        let second = store.init().expect("re-init");
        assert_eq!(first.installed_at, second.installed_at);
    }

    #[test]
    fn test_update_stamps_updated_at() {
        let (_tmp, store) = store();
        let cfg = store.update(|_| {}).expect("update");
        assert!(cfg.updated_at.is_some());
        assert_eq!(cfg.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    #[cfg(unix)]
    fn test_config_file_mode_is_0600() {
        use std::os::unix::fs::PermissionsExt;
        let (_tmp, store) = store();
        store.init().expect("init");
        let mode = std::fs::metadata(store.paths.config_file())
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    // ── add_stack / remove_stack ─────────────────────────────────────────────

    #[test]
    fn test_add_stack_registers_unconfigured_secret() {
        let (_tmp, store) = store();
        store.add_stack("stack:demo", &demo_info()).expect("add");
        let cfg = store.read().expect("read");
        let stack = &cfg.stacks["stack:demo"];
        assert!(stack.launch.bin.contains("node"));
        assert_eq!(stack.launch.cwd, "/home/u/.agora/stacks/demo");

        let secret = &cfg.secrets["API_KEY"];
        assert!(!secret.configured);
        assert!(secret.required);
        assert_eq!(secret.stack.as_deref(), Some("stack:demo"));
    }

    #[test]
    fn test_add_stack_does_not_clobber_existing_secret() {
        let (_tmp, store) = store();
        store.update_secret_status("API_KEY", true).expect("preconfigure");
        store.add_stack("stack:demo", &demo_info()).expect("add");
        assert!(store.read().expect("read").secrets["API_KEY"].configured);
    }

    #[test]
    fn test_remove_stack_drops_orphaned_secret() {
        let (_tmp, store) = store();
        store.add_stack("stack:demo", &demo_info()).expect("add");
        store.remove_stack("stack:demo").expect("remove");
        let cfg = store.read().expect("read");
        assert!(cfg.stacks.is_empty());
        assert!(!cfg.secrets.contains_key("API_KEY"));
    }

    #[test]
    fn test_remove_stack_keeps_secret_still_required_elsewhere() {
        let (_tmp, store) = store();
        store.add_stack("stack:demo", &demo_info()).expect("add demo");
        let mut other = demo_info();
        other.name = "Other".to_string();
        store.add_stack("stack:other", &other).expect("add other");

        store.remove_stack("stack:demo").expect("remove");
        let cfg = store.read().expect("read");
        assert!(cfg.secrets.contains_key("API_KEY"));
    }

    // ── tools ────────────────────────────────────────────────────────────────

    #[test]
    fn test_update_stack_tools_replaces_inventory() {
        let (_tmp, store) = store();
        store.add_stack("stack:demo", &demo_info()).expect("add");
        let tools = vec![CachedTool {
            name: "echo".to_string(),
            description: "echo".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        store.update_stack_tools("stack:demo", tools).expect("tools");
        let cfg = store.read().expect("read");
        assert_eq!(cfg.stacks["stack:demo"].tools.as_ref().expect("tools").len(), 1);
    }
}
