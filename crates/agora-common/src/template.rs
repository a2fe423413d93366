//! Prompt template rendering.
//!
//! Templates use `{{name}}` placeholders. Rendering substitutes known
//! variables and leaves unknown placeholders untouched; extraction returns
//! the distinct placeholder names in first-occurrence order.

use std::collections::BTreeMap;

/// Substitute `{{name}}` placeholders from `vars`. Unknown names pass
/// through unchanged. Whitespace inside the braces is tolerated.
#[must_use]
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated placeholder; emit the rest verbatim.
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Distinct placeholder names in first-occurrence order.
#[must_use]
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let name = after[..end].trim();
        if !name.is_empty() && !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
        rest = &after[end + 2..];
    }
    seen
}
