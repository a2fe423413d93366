//! Stack, prompt, and runtime manifest schemas.
//!
//! Each manifest parses from YAML or JSON (YAML being a superset, one parser
//! covers both), normalises (id prefix ensured, singletons coerced to
//! sequences, defaults filled), and validates. Validation collects every
//! problem into one `ManifestError::Invalid` instead of failing on the first.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::package::{is_valid_name, PackageKind};

// ── Errors ───────────────────────────────────────────────────────────────────

/// Manifest parse/validation failure.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest '{source_name}' is invalid:\n{}", errors.join("\n"))]
    Invalid {
        source_name: String,
        errors: Vec<String>,
    },

    #[error("Manifest '{source_name}' cannot be parsed: {cause}")]
    Parse { source_name: String, cause: String },
}

// ── Shared pieces ────────────────────────────────────────────────────────────

/// A secret a stack needs at launch. Accepts the shorthand string form
/// (`- GITHUB_TOKEN`), which coerces to `{name, required: true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRequirement {
    pub name: String,
    pub required: bool,
}

impl<'de> Deserialize<'de> for SecretRequirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Full {
                name: String,
                #[serde(default = "default_true")]
                required: bool,
            },
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Name(name) => SecretRequirement { name, required: true },
            Repr::Full { name, required } => SecretRequirement { name, required },
        })
    }
}

fn default_true() -> bool {
    true
}

/// Deserialize a string or a sequence of strings into a `Vec<String>`.
fn string_or_seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<Repr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Repr::One(s)) => vec![s],
        Some(Repr::Many(v)) => v,
    })
}

/// Accept a loose `X.Y.Z` numeric triple.
fn is_semver(version: &str) -> bool {
    let mut parts = 0;
    for part in version.split('.') {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 3
}

fn ensure_prefix(id: &str, kind: PackageKind) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("{kind}:{id}")
    }
}

// ── Stack manifest ───────────────────────────────────────────────────────────

/// `manifest.json` / `stack.yaml` of an MCP server stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub requires: StackRequires,
    /// Launch command, array form preferred. A plain string coerces to a
    /// one-element array.
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    /// Legacy launch object, superseded by `command`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<IoField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<IoField>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// A stack's dependency declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackRequires {
    #[serde(deserialize_with = "string_or_seq", skip_serializing_if = "Vec::is_empty")]
    pub runtimes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub npm: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pip: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<SecretRequirement>,
}

/// Legacy `mcp` launch object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpSpec {
    pub command: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

/// One declared stack input or output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IoField {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StackManifest {
    /// Parse from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Parse` on malformed input and
    /// `ManifestError::Invalid` when required fields are missing or
    /// malformed. The returned manifest is already normalised.
    pub fn parse(source_name: &str, text: &str) -> Result<Self, ManifestError> {
        let mut manifest: StackManifest =
            serde_yaml::from_str(text).map_err(|e| ManifestError::Parse {
                source_name: source_name.to_string(),
                cause: e.to_string(),
            })?;
        manifest.normalize();
        manifest.validate(source_name)?;
        Ok(manifest)
    }

    /// Ensure the `stack:` id prefix.
    pub fn normalize(&mut self) {
        if !self.id.is_empty() {
            self.id = ensure_prefix(&self.id, PackageKind::Stack);
        }
    }

    /// Validate required fields, collecting every failure.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Invalid` listing each problem.
    pub fn validate(&self, source_name: &str) -> Result<(), ManifestError> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("missing required field: id".to_string());
        } else if !is_valid_name(crate::package::strip_kind_prefix(&self.id)) {
            errors.push(format!("invalid id: '{}'", self.id));
        }
        if self.name.is_empty() {
            errors.push("missing required field: name".to_string());
        }
        if self.version.is_empty() {
            errors.push("missing required field: version".to_string());
        } else if !is_semver(&self.version) {
            errors.push(format!("version '{}' is not a semver triple", self.version));
        }
        for secret in &self.requires.secrets {
            if secret.name.is_empty() {
                errors.push("secret requirement with empty name".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid { source_name: source_name.to_string(), errors })
        }
    }
}

// ── Prompt manifest ──────────────────────────────────────────────────────────

/// Variable type of a prompt template placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Text,
    Select,
    File,
}

/// One declared template variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// YAML sidecar of a prompt template. `template` may instead come from a
/// sibling `prompt.md`, which the loader fills in before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptManifest {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<PromptVariable>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl PromptManifest {
    /// Parse and validate from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// See `StackManifest::parse`.
    pub fn parse(source_name: &str, text: &str) -> Result<Self, ManifestError> {
        let mut manifest: PromptManifest =
            serde_yaml::from_str(text).map_err(|e| ManifestError::Parse {
                source_name: source_name.to_string(),
                cause: e.to_string(),
            })?;
        if !manifest.id.is_empty() {
            manifest.id = ensure_prefix(&manifest.id, PackageKind::Prompt);
        }
        manifest.validate(source_name)?;
        Ok(manifest)
    }

    /// Validate required fields.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Invalid` listing each problem.
    pub fn validate(&self, source_name: &str) -> Result<(), ManifestError> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("missing required field: id".to_string());
        }
        if self.name.is_empty() {
            errors.push("missing required field: name".to_string());
        }
        for var in &self.variables {
            if var.name.is_empty() {
                errors.push("variable with empty name".to_string());
            }
            if var.var_type == VariableType::Select && var.options.is_empty() {
                errors.push(format!("select variable '{}' has no options", var.name));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid { source_name: source_name.to_string(), errors })
        }
    }
}

// ── Runtime manifest ─────────────────────────────────────────────────────────

/// Per-platform runtime download entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeBinary {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Manifest of a managed language runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Platform tag → download entry.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub binaries: BTreeMap<String, RuntimeBinary>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl RuntimeManifest {
    /// Parse and validate from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// See `StackManifest::parse`.
    pub fn parse(source_name: &str, text: &str) -> Result<Self, ManifestError> {
        let mut manifest: RuntimeManifest =
            serde_yaml::from_str(text).map_err(|e| ManifestError::Parse {
                source_name: source_name.to_string(),
                cause: e.to_string(),
            })?;
        if !manifest.id.is_empty() {
            manifest.id = ensure_prefix(&manifest.id, PackageKind::Runtime);
        }
        manifest.validate(source_name)?;
        Ok(manifest)
    }

    /// Validate required fields.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::Invalid` listing each problem.
    pub fn validate(&self, source_name: &str) -> Result<(), ManifestError> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("missing required field: id".to_string());
        }
        if self.name.is_empty() {
            errors.push("missing required field: name".to_string());
        }
        if self.version.is_empty() {
            errors.push("missing required field: version".to_string());
        }
        for (platform, binary) in &self.binaries {
            if binary.url.is_empty() {
                errors.push(format!("binaries.{platform} has an empty url"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid { source_name: source_name.to_string(), errors })
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
