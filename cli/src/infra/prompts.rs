//! Installed prompt loading and rendering.
//!
//! A prompt install is either a directory with a YAML/JSON sidecar (the
//! template coming inline or from a sibling `prompt.md`) or a bare
//! `prompts/<name>.md` file, for which a manifest is synthesised from the
//! template's own placeholders.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use agora_common::template::{extract_variables, render};
use agora_common::{PackageKind, PromptManifest, PromptVariable};

use crate::infra::paths::AgoraPaths;

/// Load an installed prompt by name.
///
/// # Errors
///
/// Returns an error when the prompt is not installed or its manifest is
/// invalid.
pub fn load_prompt(paths: &AgoraPaths, name: &str) -> Result<PromptManifest> {
    let dir = paths.install_dir(PackageKind::Prompt, name);
    if dir.is_dir() {
        let sidecar = ["prompt.yaml", "manifest.yaml", "manifest.json"]
            .iter()
            .map(|f| dir.join(f))
            .find(|p| p.is_file())
            .with_context(|| format!("prompt '{name}' has no manifest in {}", dir.display()))?;
        let text = std::fs::read_to_string(&sidecar)
            .with_context(|| format!("reading {}", sidecar.display()))?;
        let mut manifest = PromptManifest::parse(&sidecar.to_string_lossy(), &text)?;

        if manifest.template.is_none() {
            let sibling = dir.join("prompt.md");
            let template = std::fs::read_to_string(&sibling)
                .with_context(|| format!("reading {}", sibling.display()))?;
            manifest.template = Some(template);
        }
        return Ok(manifest);
    }

    let file = paths.prompt_file(name);
    let template = std::fs::read_to_string(&file)
        .with_context(|| format!("prompt '{name}' is not installed"))?;
    let variables = extract_variables(&template)
        .into_iter()
        .map(|var| PromptVariable { name: var, required: true, ..PromptVariable::default() })
        .collect();
    Ok(PromptManifest {
        id: format!("prompt:{name}"),
        name: name.to_string(),
        template: Some(template),
        variables,
        ..PromptManifest::default()
    })
}

/// Render a prompt with the given variable values. Declared defaults fill
/// gaps; missing required variables fail with their names listed.
///
/// # Errors
///
/// Returns an error when the prompt has no template or required variables
/// are missing.
pub fn render_prompt(
    manifest: &PromptManifest,
    values: &BTreeMap<String, String>,
) -> Result<String> {
    let template = manifest
        .template
        .as_deref()
        .with_context(|| format!("prompt '{}' has no template", manifest.id))?;

    let mut vars = values.clone();
    let mut missing = Vec::new();
    for variable in &manifest.variables {
        if vars.contains_key(&variable.name) {
            continue;
        }
        match &variable.default {
            Some(default) => {
                vars.insert(variable.name.clone(), default.clone());
            }
            None if variable.required => missing.push(variable.name.clone()),
            None => {}
        }
    }
    anyhow::ensure!(
        missing.is_empty(),
        "missing required variables: {}",
        missing.join(", ")
    );

    Ok(render(template, &vars))
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_paths() -> (tempfile::TempDir, AgoraPaths) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let paths = AgoraPaths::with_home(tmp.path().join(".agora"));
        paths.ensure_directories().expect("layout");
        (tmp, paths)
    }

    #[test]
    fn test_load_directory_prompt_with_sibling_template() {
        let (_tmp, paths) = temp_paths();
        let dir = paths.install_dir(PackageKind::Prompt, "review");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(
            dir.join("prompt.yaml"),
            "id: review\nname: Code Review\nvariables:\n  - name: file\n    required: true\n",
        )
        .expect("write sidecar");
        std::fs::write(dir.join("prompt.md"), "Review {{file}} carefully.").expect("write md");

        let manifest = load_prompt(&paths, "review").expect("loads");
        assert_eq!(manifest.id, "prompt:review");
        assert_eq!(manifest.template.as_deref(), Some("Review {{file}} carefully."));
    }

    #[test]
    fn test_load_single_file_prompt_synthesises_variables() {
        let (_tmp, paths) = temp_paths();
        std::fs::write(paths.prompt_file("summary"), "Summarise {{target}} in {{words}} words.")
            .expect("write");

        let manifest = load_prompt(&paths, "summary").expect("loads");
        let names: Vec<&str> = manifest.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["target", "words"]);
        assert!(manifest.variables.iter().all(|v| v.required));
    }

    #[test]
    fn test_render_applies_defaults_and_reports_missing() {
        let manifest = PromptManifest {
            id: "prompt:x".to_string(),
            name: "x".to_string(),
            template: Some("{{a}} {{b}}".to_string()),
            variables: vec![
                PromptVariable {
                    name: "a".to_string(),
                    required: true,
                    ..PromptVariable::default()
                },
                PromptVariable {
                    name: "b".to_string(),
                    default: Some("fallback".to_string()),
                    ..PromptVariable::default()
                },
            ],
            ..PromptManifest::default()
        };

        let err = render_prompt(&manifest, &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("a"));

        let mut values = BTreeMap::new();
        values.insert("a".to_string(), "hello".to_string());
        let out = render_prompt(&manifest, &values).expect("renders");
        assert_eq!(out, "hello fallback");
    }

    #[test]
    fn test_load_missing_prompt_errors() {
        let (_tmp, paths) = temp_paths();
        assert!(load_prompt(&paths, "absent").is_err());
    }
}
