//! Application service — transcript import plus install-state mirroring.
//!
//! A thin orchestration over the session database: scan the provider
//! directories under the user's home, import what is found, refresh the
//! reporting mirror of installed packages, and leave a log event behind.

use std::path::Path;

use anyhow::Result;

use agora_common::PackageId;

use crate::application::ports::ProgressReporter;
use crate::application::services::install::list_installed;
use crate::infra::db::{ImportOptions, ImportStats, LogEvent, SessionDb};
use crate::infra::lockfile::read_lockfile;
use crate::infra::paths::AgoraPaths;

/// Import transcripts from `home`, mirror installed packages, and record
/// the run in the log stream.
///
/// # Errors
///
/// Returns an error on database failure; per-file parse problems are
/// reported through `ImportStats::errors`.
pub fn run_import(
    db: &SessionDb,
    paths: &AgoraPaths,
    home: &Path,
    options: &ImportOptions,
    reporter: &impl ProgressReporter,
) -> Result<ImportStats> {
    reporter.step("scanning provider transcripts...");
    let stats = db.import_from_home(home, options)?;

    for manifest in list_installed(paths)? {
        let lockfile = PackageId::parse(&manifest.id)
            .ok()
            .and_then(|id| read_lockfile(paths, id.kind, &id.name).ok().flatten());
        db.mirror_install(&manifest, lockfile.as_ref())?;
    }

    db.store_log_event(&LogEvent {
        source: "importer".to_string(),
        level: if stats.errors.is_empty() { "info" } else { "warn" }.to_string(),
        event_type: "sessions_import".to_string(),
        payload: Some(serde_json::json!({
            "scanned": stats.scanned,
            "imported": stats.imported,
            "skippedExisting": stats.skipped_existing,
            "skippedDead": stats.skipped_dead,
            "errors": stats.errors.len(),
        })),
        ..LogEvent::default()
    })?;

    reporter.success(&format!(
        "imported {} of {} sessions ({} already present, {} empty)",
        stats.imported, stats.scanned, stats.skipped_existing, stats.skipped_dead
    ));
    Ok(stats)
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Quiet;
    impl ProgressReporter for Quiet {
        fn step(&self, _: &str) {}
        fn success(&self, _: &str) {}
        fn warn(&self, _: &str) {}
    }

    fn claude_fixture(home: &Path) {
        let dir = home.join(".claude/projects/-repo");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(
            dir.join("s1.jsonl"),
            r#"{"type":"user","timestamp":"2025-06-01T00:00:00Z","message":{"role":"user","content":[{"type":"text","text":"hello there"}]}}
{"type":"assistant","message":{"role":"assistant","model":"claude-sonnet-4-5-x","content":[{"type":"text","text":"hi"}],"usage":{"input_tokens":10,"output_tokens":5}}}
"#,
        )
        .expect("write");
    }

    #[test]
    fn test_import_is_deduplicated_on_rerun() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let home = tmp.path();
        let paths = AgoraPaths::with_home(home.join(".agora"));
        paths.ensure_directories().expect("layout");
        claude_fixture(home);

        let db = SessionDb::open_in_memory().expect("opens");
        let first =
            run_import(&db, &paths, home, &ImportOptions::default(), &Quiet).expect("imports");
        assert_eq!(first.imported, 1);

        let second =
            run_import(&db, &paths, home, &ImportOptions::default(), &Quiet).expect("imports");
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped_existing, 1);
    }

    #[test]
    fn test_import_leaves_log_event() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let home = tmp.path();
        let paths = AgoraPaths::with_home(home.join(".agora"));
        paths.ensure_directories().expect("layout");
        claude_fixture(home);

        let db = SessionDb::open_in_memory().expect("opens");
        run_import(&db, &paths, home, &ImportOptions::default(), &Quiet).expect("imports");

        let rows = db
            .query_logs(&crate::infra::db::LogFilter {
                event_type: Some("sessions_import".to_string()),
                ..Default::default()
            })
            .expect("queries");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, "importer");
    }
}
