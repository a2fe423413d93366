//! File-backed secret store (`~/.agora/secrets.json`, mode 0600).
//!
//! The platform keychain backend is pluggable behind the `SecretStore`
//! port; this is the portable default used everywhere but macOS.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::application::ports::SecretStore;
use crate::infra::paths::AgoraPaths;

/// Secrets as a flat `{NAME: value}` JSON object on disk.
pub struct FileSecretStore {
    path: std::path::PathBuf,
}

impl FileSecretStore {
    #[must_use]
    pub fn new(paths: &AgoraPaths) -> Self {
        Self { path: paths.secrets_file() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.is_file() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn save(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(secrets).context("serializing secrets")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing {}", self.path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        let mut secrets = self.load()?;
        secrets.insert(name.to_string(), value.to_string());
        self.save(&secrets)
    }
}
