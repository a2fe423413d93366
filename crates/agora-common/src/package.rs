//! Package identity: kinds, `kind:name` ids, and the name grammar.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors produced while parsing package identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackageError {
    #[error("Invalid package id '{0}': kind must be one of stack, prompt, runtime, binary, agent")]
    InvalidPackageId(String),

    #[error("Invalid package name '{0}': must match [a-z0-9-]+")]
    InvalidName(String),
}

// ── Kinds ────────────────────────────────────────────────────────────────────

/// The five package kinds agora manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Stack,
    Prompt,
    Runtime,
    Binary,
    Agent,
}

impl PackageKind {
    /// All kinds in the fixed search/iteration order.
    pub const ALL: [PackageKind; 5] = [
        PackageKind::Stack,
        PackageKind::Prompt,
        PackageKind::Runtime,
        PackageKind::Binary,
        PackageKind::Agent,
    ];

    /// The id prefix for this kind (`stack`, `prompt`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PackageKind::Stack => "stack",
            PackageKind::Prompt => "prompt",
            PackageKind::Runtime => "runtime",
            PackageKind::Binary => "binary",
            PackageKind::Agent => "agent",
        }
    }

    /// The pluralised form used for registry index keys and on-disk
    /// directories (`binary` pluralises as `binaries`).
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            PackageKind::Stack => "stacks",
            PackageKind::Prompt => "prompts",
            PackageKind::Runtime => "runtimes",
            PackageKind::Binary => "binaries",
            PackageKind::Agent => "agents",
        }
    }

    /// Parse a kind prefix.
    #[must_use]
    pub fn parse(s: &str) -> Option<PackageKind> {
        match s {
            "stack" => Some(PackageKind::Stack),
            "prompt" => Some(PackageKind::Prompt),
            "runtime" => Some(PackageKind::Runtime),
            "binary" => Some(PackageKind::Binary),
            "agent" => Some(PackageKind::Agent),
            _ => None,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Identifiers ──────────────────────────────────────────────────────────────

/// A fully qualified package identifier: `<kind>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    pub kind: PackageKind,
    pub name: String,
}

impl PackageId {
    /// Build an id from parts, validating the name grammar.
    ///
    /// # Errors
    ///
    /// Returns `PackageError::InvalidName` if `name` is empty or contains
    /// characters outside `[a-z0-9-]`.
    pub fn new(kind: PackageKind, name: &str) -> Result<Self, PackageError> {
        if !is_valid_name(name) {
            return Err(PackageError::InvalidName(name.to_string()));
        }
        Ok(Self { kind, name: name.to_string() })
    }

    /// Parse a short or fully qualified id. Short ids (no prefix) default to
    /// `stack`.
    ///
    /// # Errors
    ///
    /// Returns `PackageError::InvalidPackageId` when the prefix is not one of
    /// the five kinds, or `PackageError::InvalidName` when the name part
    /// violates the grammar.
    pub fn parse(id: &str) -> Result<Self, PackageError> {
        match id.split_once(':') {
            Some((prefix, name)) => {
                let kind = PackageKind::parse(prefix)
                    .ok_or_else(|| PackageError::InvalidPackageId(id.to_string()))?;
                Self::new(kind, name)
            }
            None => Self::new(PackageKind::Stack, id),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Check the package name grammar: `[a-z0-9-]+`.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Strip any valid kind prefix from a descriptor's own id, returning the
/// bare name. Ids without a recognised prefix are returned unchanged.
#[must_use]
pub fn strip_kind_prefix(id: &str) -> &str {
    match id.split_once(':') {
        Some((prefix, name)) if PackageKind::parse(prefix).is_some() => name,
        _ => id,
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    // ── PackageId::parse ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_fully_qualified_id() {
        let id = PackageId::parse("runtime:node").expect("valid id");
        assert_eq!(id.kind, PackageKind::Runtime);
        assert_eq!(id.name, "node");
    }

    #[test]
    fn test_parse_short_id_defaults_to_stack() {
        let id = PackageId::parse("github-tools").expect("valid id");
        assert_eq!(id.kind, PackageKind::Stack);
        assert_eq!(id.name, "github-tools");
    }

    #[test]
    fn test_parse_unknown_kind_is_rejected() {
        let err = PackageId::parse("plugin:foo").unwrap_err();
        assert!(matches!(err, PackageError::InvalidPackageId(_)));
    }

    #[test]
    fn test_parse_uppercase_name_is_rejected() {
        let err = PackageId::parse("stack:Foo").unwrap_err();
        assert!(matches!(err, PackageError::InvalidName(_)));
    }

    #[test]
    fn test_parse_empty_name_is_rejected() {
        assert!(PackageId::parse("stack:").is_err());
        assert!(PackageId::parse("").is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in PackageKind::ALL {
            let id = PackageId::new(kind, "ripgrep").expect("valid");
            let back = PackageId::parse(&id.to_string()).expect("round trip");
            assert_eq!(back, id);
        }
    }

    // ── Kind helpers ─────────────────────────────────────────────────────────

    #[test]
    fn test_binary_pluralises_as_binaries() {
        assert_eq!(PackageKind::Binary.plural(), "binaries");
    }

    #[test]
    fn test_strip_kind_prefix_only_strips_valid_kinds() {
        assert_eq!(strip_kind_prefix("stack:demo"), "demo");
        assert_eq!(strip_kind_prefix("demo"), "demo");
        assert_eq!(strip_kind_prefix("weird:demo"), "weird:demo");
    }
}
