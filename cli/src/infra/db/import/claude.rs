//! Claude transcript parser.
//!
//! Layout: `~/.claude/projects/<projectDir>/<sessionId>.jsonl`. Lines are
//! user/assistant events whose `message.content` is an array of typed
//! parts. Tool results are filtered out of user messages; assistant usage
//! counts cache reads via `cache_read_input_tokens`.

use std::path::Path;

use serde_json::Value as JsonValue;

use super::{title_from_message, NewSession, NewTurn, ParsedSession};
use crate::infra::db::pricing::TokenUsage;

/// Scan every project directory and parse each session file. Parse
/// failures are recorded in `errors` and skipped.
#[must_use]
pub fn scan(home: &Path, infer_titles: bool, errors: &mut Vec<String>) -> Vec<ParsedSession> {
    let projects_dir = home.join(".claude").join("projects");
    let mut sessions = Vec::new();

    let Ok(projects) = std::fs::read_dir(&projects_dir) else {
        return sessions;
    };
    let mut project_dirs: Vec<_> = projects.flatten().map(|e| e.path()).collect();
    project_dirs.sort();

    for project_dir in project_dirs.into_iter().filter(|p| p.is_dir()) {
        let project_name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let Ok(files) = std::fs::read_dir(&project_dir) else { continue };
        let mut session_files: Vec<_> = files
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "jsonl"))
            .collect();
        session_files.sort();

        for file in session_files {
            match std::fs::read_to_string(&file) {
                Ok(text) => {
                    sessions.push(parse_session(&file, &project_name, &text, infer_titles));
                }
                Err(e) => errors.push(format!("{}: {e}", file.display())),
            }
        }
    }
    sessions
}

fn parse_session(
    file: &Path,
    project: &str,
    text: &str,
    infer_titles: bool,
) -> ParsedSession {
    let session_id = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut session = NewSession {
        provider: "claude".to_string(),
        provider_session_id: session_id,
        project: Some(project.to_string()),
        ..NewSession::default()
    };
    let mut turns: Vec<NewTurn> = Vec::new();
    let mut current: Option<NewTurn> = None;

    for line in text.lines() {
        let Ok(event) = serde_json::from_str::<JsonValue>(line) else { continue };
        let timestamp = event.get("timestamp").and_then(JsonValue::as_str);
        if session.started_at.is_none() {
            session.started_at = timestamp.map(ToString::to_string);
        }
        if let Some(ts) = timestamp {
            session.ended_at = Some(ts.to_string());
        }
        if session.cwd.is_none() {
            session.cwd = event.get("cwd").and_then(JsonValue::as_str).map(ToString::to_string);
        }

        match event.get("type").and_then(JsonValue::as_str) {
            Some("user") => {
                let message = &event["message"];
                let text = user_text(&message["content"]);
                // Pure tool-result events continue the current turn.
                if text.is_empty() {
                    continue;
                }
                if let Some(done) = current.take() {
                    turns.push(done);
                }
                current = Some(NewTurn {
                    user_message: text,
                    created_at: timestamp.map(ToString::to_string),
                    ..NewTurn::default()
                });
            }
            Some("assistant") => {
                let Some(turn) = current.as_mut() else { continue };
                let message = &event["message"];
                if let Some(model) = message.get("model").and_then(JsonValue::as_str) {
                    turn.model = Some(model.to_string());
                    if session.model.is_none() {
                        session.model = Some(model.to_string());
                    }
                }
                append_assistant(turn, &message["content"]);
                let usage = &message["usage"];
                turn.usage = add_usage(
                    turn.usage,
                    TokenUsage {
                        input_tokens: usage["input_tokens"].as_i64().unwrap_or(0),
                        output_tokens: usage["output_tokens"].as_i64().unwrap_or(0),
                        cache_read_tokens: usage["cache_read_input_tokens"].as_i64().unwrap_or(0),
                    },
                );
            }
            _ => {}
        }
    }
    if let Some(done) = current.take() {
        turns.push(done);
    }

    if infer_titles && session.title.is_none() {
        session.title = turns.first().and_then(|t| title_from_message(&t.user_message));
    }

    ParsedSession { session, turns }
}

/// Text parts of a user message, with tool results filtered out. A plain
/// string content is taken verbatim.
fn user_text(content: &JsonValue) -> String {
    match content {
        JsonValue::String(text) => text.trim().to_string(),
        JsonValue::Array(parts) => parts
            .iter()
            .filter(|part| part["type"] == "text")
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => String::new(),
    }
}

fn append_assistant(turn: &mut NewTurn, content: &JsonValue) {
    let JsonValue::Array(parts) = content else { return };
    for part in parts {
        match part["type"].as_str() {
            Some("text") => {
                if let Some(text) = part["text"].as_str() {
                    if !turn.assistant_response.is_empty() {
                        turn.assistant_response.push('\n');
                    }
                    turn.assistant_response.push_str(text);
                }
            }
            Some("tool_use") => {
                if let Some(name) = part["name"].as_str() {
                    if !turn.tools_used.iter().any(|t| t == name) {
                        turn.tools_used.push(name.to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

fn add_usage(a: TokenUsage, b: TokenUsage) -> TokenUsage {
    TokenUsage {
        input_tokens: a.input_tokens + b.input_tokens,
        output_tokens: a.output_tokens + b.output_tokens,
        cache_read_tokens: a.cache_read_tokens + b.cache_read_tokens,
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"type":"user","sessionId":"abc","cwd":"/work","timestamp":"2025-06-01T10:00:00Z","message":{"role":"user","content":[{"type":"text","text":"fix authentication bug in login handler"}]}}
{"type":"assistant","timestamp":"2025-06-01T10:00:05Z","message":{"role":"assistant","model":"claude-sonnet-4-5-20250101","content":[{"type":"text","text":"Looking at the handler now."},{"type":"tool_use","name":"Read","input":{}}],"usage":{"input_tokens":1200,"output_tokens":80,"cache_read_input_tokens":400}}}
{"type":"user","timestamp":"2025-06-01T10:00:06Z","message":{"role":"user","content":[{"type":"tool_result","content":"file contents"}]}}
{"type":"assistant","timestamp":"2025-06-01T10:00:09Z","message":{"role":"assistant","model":"claude-sonnet-4-5-20250101","content":[{"type":"text","text":"Fixed."}],"usage":{"input_tokens":300,"output_tokens":40,"cache_read_input_tokens":100}}}
"#;

    fn write_sample(home: &Path) {
        let dir = home.join(".claude/projects/-work-repo");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("abc.jsonl"), SAMPLE).expect("write");
    }

    #[test]
    fn test_scan_parses_session_and_turns() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_sample(tmp.path());
        let mut errors = Vec::new();
        let sessions = scan(tmp.path(), true, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(sessions.len(), 1);

        let parsed = &sessions[0];
        assert_eq!(parsed.session.provider, "claude");
        assert_eq!(parsed.session.provider_session_id, "abc");
        assert_eq!(parsed.session.project.as_deref(), Some("-work-repo"));
        assert_eq!(parsed.session.cwd.as_deref(), Some("/work"));
        assert_eq!(parsed.session.model.as_deref(), Some("claude-sonnet-4-5-20250101"));
        assert_eq!(parsed.turns.len(), 1);
    }

    #[test]
    fn test_tool_results_are_filtered_and_usage_accumulates() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_sample(tmp.path());
        let sessions = scan(tmp.path(), true, &mut Vec::new());
        let turn = &sessions[0].turns[0];

        assert_eq!(turn.user_message, "fix authentication bug in login handler");
        assert!(!turn.assistant_response.contains("file contents"));
        assert!(turn.assistant_response.contains("Fixed."));
        assert_eq!(turn.usage.input_tokens, 1500);
        assert_eq!(turn.usage.output_tokens, 120);
        assert_eq!(turn.usage.cache_read_tokens, 500);
        assert_eq!(turn.tools_used, vec!["Read"]);
    }

    #[test]
    fn test_title_is_inferred_from_first_user_text() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_sample(tmp.path());
        let sessions = scan(tmp.path(), true, &mut Vec::new());
        assert_eq!(
            sessions[0].session.title.as_deref(),
            Some("fix authentication bug in login handler")
        );

        let without = scan(tmp.path(), false, &mut Vec::new());
        assert!(without[0].session.title.is_none());
    }

    #[test]
    fn test_missing_provider_directory_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(scan(tmp.path(), true, &mut Vec::new()).is_empty());
    }
}
