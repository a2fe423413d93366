//! JSON output helpers.
//!
//! Every `--json` code path renders through here so the shapes stay
//! stable. Errors carry the taxonomy code from `domain::error` as a
//! machine-readable tag.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::error::error_code;

/// Pretty-print any serializable payload to stdout.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render<T: Serialize>(payload: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).context("JSON serialization")?
    );
    Ok(())
}

/// Format a failure as the stable error object:
///
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "download_failed"
/// }
/// ```
#[must_use]
pub fn format_error(err: &anyhow::Error) -> String {
    let obj = serde_json::json!({
        "error": true,
        "message": format!("{err:#}"),
        "code": error_code(err),
    });
    serde_json::to_string_pretty(&obj).unwrap_or_else(|_| {
        // Only non-finite floats and non-string keys can fail, and the
        // object above has neither.
        r#"{"error":true,"message":"unknown","code":"internal"}"#.to_string()
    })
}
