//! Launch-record derivation for installed stacks.
//!
//! Pure functions: given a manifest's `command` array, the runtime tag, and
//! the install directory, produce the normalised `{bin, args, cwd}` record
//! stored in the central config. Path rewriting against the install
//! directory happens later, at agent-registration time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Normalised launch record: absolute interpreter path, ordered args, and a
/// working directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchConfig {
    pub bin: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub cwd: String,
}

/// Absolute path of a bundled runtime binary under the runtimes directory.
///
/// Unix layouts keep binaries under `<runtime>/bin/`; Windows runtimes ship
/// the executable at the install root with an `.exe` suffix.
#[must_use]
pub fn bundled_runtime_bin(runtimes_dir: &Path, runtime: &str, bin: &str) -> PathBuf {
    if cfg!(windows) {
        runtimes_dir.join(runtime).join(format!("{bin}.exe"))
    } else {
        runtimes_dir.join(runtime).join("bin").join(bin)
    }
}

/// Derive the launch record for a stack.
///
/// - Empty `command`: synthesise the conventional entry point for the
///   runtime (`src/server.py` under `-u` for python, `dist/index.js` for
///   node).
/// - Otherwise split `[bin, ...args]` and rewrite `node`/`python`/`python3`
///   to the bundled interpreter and `npx` to the bundled npx. Anything else
///   passes through unchanged.
///
/// Args are kept as given; consumers rewrite relative path-like args
/// against the install directory.
#[must_use]
pub fn create_launch_config(
    command: &[String],
    runtime: Option<&str>,
    stack_path: &Path,
    runtimes_dir: &Path,
) -> LaunchConfig {
    let cwd = stack_path.to_string_lossy().to_string();

    if command.is_empty() {
        let is_python = runtime.is_some_and(|r| r.starts_with("python"));
        let (bin, args) = if is_python {
            (
                bundled_runtime_bin(runtimes_dir, "python", "python3"),
                vec!["-u".to_string(), "src/server.py".to_string()],
            )
        } else {
            (
                bundled_runtime_bin(runtimes_dir, "node", "node"),
                vec!["dist/index.js".to_string()],
            )
        };
        return LaunchConfig { bin: bin.to_string_lossy().to_string(), args, cwd };
    }

    let bin = command[0].as_str();
    let resolved = match bin {
        "node" => bundled_runtime_bin(runtimes_dir, "node", "node")
            .to_string_lossy()
            .to_string(),
        "python" | "python3" => bundled_runtime_bin(runtimes_dir, "python", "python3")
            .to_string_lossy()
            .to_string(),
        "npx" => bundled_runtime_bin(runtimes_dir, "node", "npx")
            .to_string_lossy()
            .to_string(),
        other => other.to_string(),
    };

    LaunchConfig { bin: resolved, args: command[1..].to_vec(), cwd }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
