//! The well-known directory layout under the agora home.
//!
//! `AgoraPaths` is a value type: cheap to clone, resolved once at startup
//! (honouring the `AGORA_HOME` override used by tests), and passed
//! explicitly to everything that touches disk. No hidden globals.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use agora_common::PackageKind;

/// Application home directory name under `$HOME`.
pub const APP_DIR: &str = ".agora";

/// Central config file name (inside the home directory).
pub const CONFIG_FILE: &str = "agora.json";

/// All well-known paths beneath the agora home.
#[derive(Debug, Clone)]
pub struct AgoraPaths {
    home: PathBuf,
}

impl AgoraPaths {
    /// Resolve the layout from the environment: `AGORA_HOME` when set,
    /// otherwise `~/.agora`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn resolve() -> Result<Self> {
        if let Ok(home) = std::env::var("AGORA_HOME") {
            return Ok(Self::with_home(PathBuf::from(home)));
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(Self::with_home(home.join(APP_DIR)))
    }

    /// Build a layout rooted at an explicit directory (used in tests).
    #[must_use]
    pub fn with_home(home: PathBuf) -> Self {
        Self { home }
    }

    /// The agora home itself.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    // ── Directories ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn packages(&self) -> PathBuf {
        self.home.join("packages")
    }

    #[must_use]
    pub fn stacks(&self) -> PathBuf {
        self.home.join("stacks")
    }

    #[must_use]
    pub fn prompts(&self) -> PathBuf {
        self.home.join("prompts")
    }

    #[must_use]
    pub fn runtimes(&self) -> PathBuf {
        self.home.join("runtimes")
    }

    #[must_use]
    pub fn binaries(&self) -> PathBuf {
        self.home.join("binaries")
    }

    #[must_use]
    pub fn agents(&self) -> PathBuf {
        self.home.join("agents")
    }

    /// Content-addressed runtime store (`store/<runtime>-<ver>-<platform>/`).
    #[must_use]
    pub fn store(&self) -> PathBuf {
        self.home.join("store")
    }

    /// Symlink shims exposed on `PATH`.
    #[must_use]
    pub fn bins(&self) -> PathBuf {
        self.home.join("bins")
    }

    #[must_use]
    pub fn locks(&self) -> PathBuf {
        self.home.join("locks")
    }

    #[must_use]
    pub fn vault(&self) -> PathBuf {
        self.home.join("vault")
    }

    #[must_use]
    pub fn db_dir(&self) -> PathBuf {
        self.home.join("db")
    }

    #[must_use]
    pub fn cache(&self) -> PathBuf {
        self.home.join("cache")
    }

    #[must_use]
    pub fn logs(&self) -> PathBuf {
        self.home.join("logs")
    }

    // ── Files ────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// Advisory lock guarding `config_file`.
    #[must_use]
    pub fn config_lock_file(&self) -> PathBuf {
        self.home.join(format!("{CONFIG_FILE}.lock"))
    }

    #[must_use]
    pub fn secrets_file(&self) -> PathBuf {
        self.home.join("secrets.json")
    }

    #[must_use]
    pub fn registry_cache(&self) -> PathBuf {
        self.cache().join("registry.json")
    }

    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.cache().join("downloads")
    }

    #[must_use]
    pub fn tool_index_cache(&self) -> PathBuf {
        self.cache().join("tool-index.json")
    }

    #[must_use]
    pub fn db_file(&self) -> PathBuf {
        self.db_dir().join("agora.db")
    }

    // ── Per-package paths ────────────────────────────────────────────────────

    /// The directory holding installs of one kind.
    #[must_use]
    pub fn kind_dir(&self, kind: PackageKind) -> PathBuf {
        match kind {
            PackageKind::Stack => self.stacks(),
            PackageKind::Prompt => self.prompts(),
            PackageKind::Runtime => self.runtimes(),
            PackageKind::Binary => self.binaries(),
            PackageKind::Agent => self.agents(),
        }
    }

    /// The install directory of one package.
    #[must_use]
    pub fn install_dir(&self, kind: PackageKind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(name)
    }

    /// Single-file prompt location (`prompts/<name>.md`).
    #[must_use]
    pub fn prompt_file(&self, name: &str) -> PathBuf {
        self.prompts().join(format!("{name}.md"))
    }

    /// Lockfile location: `locks/<kind-plural>/<name>.lock.yaml`.
    #[must_use]
    pub fn lockfile(&self, kind: PackageKind, name: &str) -> PathBuf {
        self.locks().join(kind.plural()).join(format!("{name}.lock.yaml"))
    }

    /// A package is installed iff its install directory holds a readable
    /// `manifest.json` (or the legacy `runtime.json`). Single-file prompts
    /// count when the `.md` file exists.
    #[must_use]
    pub fn is_installed(&self, kind: PackageKind, name: &str) -> bool {
        let dir = self.install_dir(kind, name);
        if dir.join("manifest.json").is_file() || dir.join("runtime.json").is_file() {
            return true;
        }
        kind == PackageKind::Prompt && self.prompt_file(name).is_file()
    }

    /// Create every well-known directory. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        let dirs = [
            self.packages(),
            self.stacks(),
            self.prompts(),
            self.runtimes(),
            self.binaries(),
            self.agents(),
            self.store(),
            self.bins(),
            self.locks(),
            self.vault(),
            self.db_dir(),
            self.cache(),
            self.downloads_dir(),
            self.logs(),
        ];
        for dir in dirs {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}

// ── Platform tag ─────────────────────────────────────────────────────────────

/// `"<os>-<arch>"` with `darwin`/`linux`/`win32` OS naming and
/// architectures normalised to `x64`/`arm64`. Unrecognised values pass
/// through unchanged.
#[must_use]
pub fn platform_arch() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}

// ── Unit tests ───────────────────────────────────────────────────────────────
