//! Gemini transcript parser.
//!
//! Layout: `~/.gemini/tmp/<sessionId>/logs.json` — one JSON document per
//! session in one of two shapes: a flat message array or `{messages:
//! [...]}`. Each user/model pair becomes a turn.

use std::path::Path;

use serde_json::Value as JsonValue;

use super::{title_from_message, NewSession, NewTurn, ParsedSession};

/// Scan every session directory for a `logs.json`.
#[must_use]
pub fn scan(home: &Path, errors: &mut Vec<String>) -> Vec<ParsedSession> {
    let root = home.join(".gemini").join("tmp");
    let mut sessions = Vec::new();

    let Ok(entries) = std::fs::read_dir(&root) else { return sessions };
    let mut dirs: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    dirs.sort();

    for dir in dirs.into_iter().filter(|p| p.is_dir()) {
        let log_file = dir.join("logs.json");
        if !log_file.is_file() {
            continue;
        }
        let session_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match std::fs::read_to_string(&log_file) {
            Ok(text) => match serde_json::from_str::<JsonValue>(&text) {
                Ok(doc) => sessions.push(parse_session(&session_id, &doc)),
                Err(e) => errors.push(format!("{}: {e}", log_file.display())),
            },
            Err(e) => errors.push(format!("{}: {e}", log_file.display())),
        }
    }
    sessions
}

fn parse_session(session_id: &str, doc: &JsonValue) -> ParsedSession {
    let empty = Vec::new();
    let messages = match doc {
        JsonValue::Array(items) => items,
        JsonValue::Object(map) => map
            .get("messages")
            .and_then(JsonValue::as_array)
            .unwrap_or(&empty),
        _ => &empty,
    };

    let mut session = NewSession {
        provider: "gemini".to_string(),
        provider_session_id: session_id.to_string(),
        ..NewSession::default()
    };
    let mut turns: Vec<NewTurn> = Vec::new();
    let mut current: Option<NewTurn> = None;

    for message in messages {
        let role = message
            .get("role")
            .or_else(|| message.get("type"))
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        let text = message_text(message);
        let timestamp = message.get("timestamp").and_then(JsonValue::as_str);
        if session.started_at.is_none() {
            session.started_at = timestamp.map(ToString::to_string);
        }
        if let Some(ts) = timestamp {
            session.ended_at = Some(ts.to_string());
        }

        match role {
            "user" => {
                if let Some(done) = current.take() {
                    turns.push(done);
                }
                current = Some(NewTurn {
                    user_message: text,
                    created_at: timestamp.map(ToString::to_string),
                    ..NewTurn::default()
                });
            }
            "model" | "assistant" => {
                if let Some(turn) = current.as_mut() {
                    if !turn.assistant_response.is_empty() {
                        turn.assistant_response.push('\n');
                    }
                    turn.assistant_response.push_str(&text);
                }
            }
            _ => {}
        }
    }
    if let Some(done) = current.take() {
        turns.push(done);
    }

    session.title = turns.first().and_then(|t| title_from_message(&t.user_message));
    ParsedSession { session, turns }
}

fn message_text(message: &JsonValue) -> String {
    if let Some(text) = message.get("text").and_then(JsonValue::as_str) {
        return text.to_string();
    }
    if let Some(text) = message.get("content").and_then(JsonValue::as_str) {
        return text.to_string();
    }
    String::new()
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_logs(home: &Path, session: &str, body: &str) {
        let dir = home.join(".gemini/tmp").join(session);
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("logs.json"), body).expect("write");
    }

    #[test]
    fn test_flat_array_shape() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_logs(
            tmp.path(),
            "sess-1",
            r#"[{"role":"user","text":"explain lifetimes"},{"role":"model","text":"Lifetimes are scopes."}]"#,
        );
        let sessions = scan(tmp.path(), &mut Vec::new());
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session.provider_session_id, "sess-1");
        assert_eq!(sessions[0].turns.len(), 1);
        assert_eq!(sessions[0].turns[0].assistant_response, "Lifetimes are scopes.");
    }

    #[test]
    fn test_wrapped_messages_shape() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_logs(
            tmp.path(),
            "sess-2",
            r#"{"messages":[{"type":"user","content":"hi"},{"type":"model","content":"hello"}]}"#,
        );
        let sessions = scan(tmp.path(), &mut Vec::new());
        assert_eq!(sessions[0].turns.len(), 1);
        assert_eq!(sessions[0].turns[0].user_message, "hi");
    }

    #[test]
    fn test_malformed_logs_recorded_as_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_logs(tmp.path(), "sess-3", "not json");
        let mut errors = Vec::new();
        let sessions = scan(tmp.path(), &mut errors);
        assert!(sessions.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_unanswered_user_message_still_forms_turn() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_logs(tmp.path(), "sess-4", r#"[{"role":"user","text":"hello?"}]"#);
        let sessions = scan(tmp.path(), &mut Vec::new());
        assert_eq!(sessions[0].turns.len(), 1);
        assert!(sessions[0].turns[0].assistant_response.is_empty());
    }
}
