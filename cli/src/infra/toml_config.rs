//! TOML agent-config handling.
//!
//! Parsing uses the `toml` crate's value model; writing goes through a
//! small serializer that keeps hand-maintained configs tidy — top-level
//! key-values first, then bracketed tables with dotted paths, each table
//! header preceded by a blank line. Only the value shapes agent configs
//! actually use are emitted: strings, booleans, numbers, and arrays of
//! strings.

use anyhow::{Context, Result};
use toml::value::{Table, Value};

/// Parse a TOML document into a table.
///
/// # Errors
///
/// Returns an error on malformed TOML.
pub fn parse(text: &str) -> Result<Table> {
    text.parse::<Table>().context("parsing TOML config")
}

/// Serialize a table, preserving the blank-line-before-table convention.
#[must_use]
pub fn write(table: &Table) -> String {
    let mut out = String::new();
    write_pairs(&mut out, table);
    for (key, value) in table {
        if let Value::Table(nested) = value {
            write_table(&mut out, &[key.clone()], nested);
        }
    }
    out
}

fn write_table(out: &mut String, path: &[String], table: &Table) {
    if !out.is_empty() {
        out.push('\n');
    }
    let header: Vec<String> = path.iter().map(|k| format_key(k)).collect();
    out.push_str(&format!("[{}]\n", header.join(".")));
    write_pairs(out, table);
    for (key, value) in table {
        if let Value::Table(nested) = value {
            let mut child = path.to_vec();
            child.push(key.clone());
            write_table(out, &child, nested);
        }
    }
}

fn write_pairs(out: &mut String, table: &Table) {
    for (key, value) in table {
        if !matches!(value, Value::Table(_)) {
            out.push_str(&format!("{} = {}\n", format_key(key), format_value(value)));
        }
    }
}

fn format_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        format!("\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Datetime(dt) => dt.to_string(),
        // Inline tables are never produced by agora's writes.
        Value::Table(_) => String::new(),
    }
}

/// Convert a JSON value into its TOML equivalent. Nulls are dropped from
/// objects; a top-level null becomes an empty string.
#[must_use]
pub fn json_to_toml(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::String(String::new()),
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(json_to_toml).collect())
        }
        serde_json::Value::Object(map) => {
            let mut table = Table::new();
            for (k, v) in map {
                if !v.is_null() {
                    table.insert(k.clone(), json_to_toml(v));
                }
            }
            Value::Table(table)
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_write_blank_line_before_each_table_header() {
        let text = "model = \"o3\"\n\n[mcp_servers.demo]\ncommand = \"/bin/node\"\n";
        let table = parse(text).expect("parses");
        let out = write(&table);
        assert_eq!(
            out,
            "model = \"o3\"\n\n[mcp_servers]\n\n[mcp_servers.demo]\ncommand = \"/bin/node\"\n"
        );
    }

    #[test]
    fn test_write_round_trips_through_parse() {
        let mut inner = Table::new();
        inner.insert("command".into(), Value::String("/usr/bin/node".into()));
        inner.insert(
            "args".into(),
            Value::Array(vec![Value::String("dist/index.js".into())]),
        );
        let mut servers = Table::new();
        servers.insert("demo".into(), Value::Table(inner));
        let mut root = Table::new();
        root.insert("mcp_servers".into(), Value::Table(servers));

        let text = write(&root);
        let back = parse(&text).expect("round trips");
        assert_eq!(back, root);
    }

    #[test]
    fn test_keys_needing_quotes_are_quoted() {
        assert_eq!(format_key("demo"), "demo");
        assert_eq!(format_key("stack:demo"), "\"stack:demo\"");
    }

    #[test]
    fn test_json_to_toml_drops_nulls_in_objects() {
        let json = serde_json::json!({"command": "/bin/x", "entry": null, "count": 2});
        let Value::Table(table) = json_to_toml(&json) else {
            panic!("expected table");
        };
        assert!(!table.contains_key("entry"));
        assert_eq!(table["count"], Value::Integer(2));
    }
}
