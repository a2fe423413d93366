//! Shared mock infrastructure for unit tests.
//!
//! Provides canned `CommandRunner` implementations and a silent reporter
//! so each test file doesn't re-define the same boilerplate.

#![allow(dead_code)]

use std::path::Path;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use agora_cli::application::ports::{CommandRunner, ProgressReporter};

// ── Cross-platform ExitStatus construction ───────────────────────────────────

/// Build an `ExitStatus` from a logical exit code.
///
/// On Unix the raw wait-status encodes the exit code in bits 8-15, so we
/// shift. On Windows `ExitStatusExt::from_raw` takes the code directly.
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output { status: exit_status(0), stdout: stdout.to_vec(), stderr: Vec::new() }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output { status: exit_status(code), stdout: Vec::new(), stderr: stderr.to_vec() }
}

// ── Command runner mocks ─────────────────────────────────────────────────────

/// Succeeds for everything and records each invocation as
/// `"program arg1 arg2"`.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingRunner {
    fn record(&self, program: &str, args: &[&str]) {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().expect("mutex").push(line);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mutex").clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.record(program, args);
        Ok(ok_output(b""))
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        self.record(program, args);
        Ok(ok_output(b""))
    }

    async fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> Result<Output> {
        self.record(program, args);
        Ok(ok_output(b""))
    }
}

/// Fails every invocation with exit code 1.
pub struct FailingRunner;

impl CommandRunner for FailingRunner {
    async fn run(&self, _program: &str, _args: &[&str]) -> Result<Output> {
        Ok(err_output(1, b"simulated failure"))
    }

    async fn run_with_timeout(
        &self,
        _program: &str,
        _args: &[&str],
        _timeout: Duration,
    ) -> Result<Output> {
        Ok(err_output(1, b"simulated failure"))
    }

    async fn run_in(&self, _dir: &Path, _program: &str, _args: &[&str]) -> Result<Output> {
        Ok(err_output(1, b"simulated failure"))
    }
}

// ── Reporter mock ────────────────────────────────────────────────────────────

/// Swallows everything.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}
