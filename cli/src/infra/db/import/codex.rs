//! Codex transcript parser.
//!
//! Layout: `~/.codex/sessions/YYYY/MM/DD/<uuid>.jsonl` — a stream of typed
//! events. `session_meta` and `turn_context` supply the session id, cwd,
//! and model; `event_msg` subtypes carry user messages, agent messages,
//! incremental token accounting, and function calls. Token usage applies
//! the per-turn `last_token_usage` deltas only; the stream's global running
//! total is ignored.

use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use super::{title_from_message, NewSession, NewTurn, ParsedSession};
use crate::infra::db::pricing::TokenUsage;

/// Scan the date-sharded session tree.
#[must_use]
pub fn scan(home: &Path, errors: &mut Vec<String>) -> Vec<ParsedSession> {
    let root = home.join(".codex").join("sessions");
    let mut files = Vec::new();
    collect_jsonl(&root, 0, &mut files);
    files.sort();

    let mut sessions = Vec::new();
    for file in files {
        match std::fs::read_to_string(&file) {
            Ok(text) => sessions.push(parse_session(&file, &text)),
            Err(e) => errors.push(format!("{}: {e}", file.display())),
        }
    }
    sessions
}

/// Walk `YYYY/MM/DD` directories (three levels) collecting `.jsonl` files.
fn collect_jsonl(dir: &Path, depth: usize, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && depth < 3 {
            collect_jsonl(&path, depth + 1, files);
        } else if path.extension().is_some_and(|e| e == "jsonl") {
            files.push(path);
        }
    }
}

fn parse_session(file: &Path, text: &str) -> ParsedSession {
    let mut session = NewSession {
        provider: "codex".to_string(),
        provider_session_id: file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
        ..NewSession::default()
    };
    let mut turns: Vec<NewTurn> = Vec::new();
    let mut current: Option<NewTurn> = None;

    for line in text.lines() {
        let Ok(event) = serde_json::from_str::<JsonValue>(line) else { continue };
        let payload = &event["payload"];
        let timestamp = event.get("timestamp").and_then(JsonValue::as_str);
        if session.started_at.is_none() {
            session.started_at = timestamp.map(ToString::to_string);
        }
        if let Some(ts) = timestamp {
            session.ended_at = Some(ts.to_string());
        }

        match event.get("type").and_then(JsonValue::as_str) {
            Some("session_meta") => {
                if let Some(id) = payload.get("id").and_then(JsonValue::as_str) {
                    session.provider_session_id = id.to_string();
                }
                if let Some(cwd) = payload.get("cwd").and_then(JsonValue::as_str) {
                    session.cwd = Some(cwd.to_string());
                }
            }
            Some("turn_context") => {
                if let Some(model) = payload.get("model").and_then(JsonValue::as_str) {
                    session.model = Some(model.to_string());
                    if let Some(turn) = current.as_mut() {
                        turn.model = Some(model.to_string());
                    }
                }
            }
            Some("event_msg") => match payload.get("type").and_then(JsonValue::as_str) {
                Some("user_message") => {
                    if let Some(done) = current.take() {
                        turns.push(done);
                    }
                    current = Some(NewTurn {
                        user_message: payload
                            .get("message")
                            .and_then(JsonValue::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        model: session.model.clone(),
                        created_at: timestamp.map(ToString::to_string),
                        ..NewTurn::default()
                    });
                }
                Some("agent_message") => {
                    if let (Some(turn), Some(message)) =
                        (current.as_mut(), payload.get("message").and_then(JsonValue::as_str))
                    {
                        if !turn.assistant_response.is_empty() {
                            turn.assistant_response.push('\n');
                        }
                        turn.assistant_response.push_str(message);
                    }
                }
                Some("token_count") => {
                    // Incremental accounting only: each event's
                    // last_token_usage is a delta for the current turn.
                    if let Some(turn) = current.as_mut() {
                        let last = &payload["info"]["last_token_usage"];
                        turn.usage = TokenUsage {
                            input_tokens: turn.usage.input_tokens
                                + last["input_tokens"].as_i64().unwrap_or(0),
                            output_tokens: turn.usage.output_tokens
                                + last["output_tokens"].as_i64().unwrap_or(0),
                            cache_read_tokens: turn.usage.cache_read_tokens
                                + last["cached_input_tokens"].as_i64().unwrap_or(0),
                        };
                    }
                }
                Some("function_call") => {
                    if let (Some(turn), Some(name)) =
                        (current.as_mut(), payload.get("name").and_then(JsonValue::as_str))
                    {
                        if !turn.tools_used.iter().any(|t| t == name) {
                            turn.tools_used.push(name.to_string());
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    if let Some(done) = current.take() {
        turns.push(done);
    }

    if session.title.is_none() {
        session.title = turns.first().and_then(|t| title_from_message(&t.user_message));
    }

    ParsedSession { session, turns }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
